//! Rendering of potential slices into images
//!
//! Unfortunately, the image crate does not currently have view types and
//! splitting operations, so we need to implement these ourselves...

use data::{Precision, ScalarFieldView};
use image::{ImageBuffer, Rgb, RgbImage};
use ndarray::Axis;
use rayon::prelude::*;

/// Number of image rows below which rendering is not parallelized further
const MIN_ROWS_PER_TASK: u32 = 16;

// Mutable view of an image
pub type RgbImageView<'a> = ImageBuffer<Rgb<u8>, &'a mut [u8]>;

// Produce a mutable view of an image
pub fn image_view(image: &mut RgbImage) -> RgbImageView {
    let width = image.width();
    let height = image.height();
    let subpixels: &mut [u8] = image;
    RgbImageView::from_raw(width, height, subpixels).expect("Should never fail")
}

// Vertically split an image view into rows before and after `row`
pub fn vsplit_image(image: RgbImageView, row: u32) -> [RgbImageView; 2] {
    let width = image.width();
    let subpixels_per_row = image.sample_layout().height_stride;
    let subpixels = image.into_raw();
    let (top, bottom) = subpixels.split_at_mut(subpixels_per_row * row as usize);
    [top, bottom].map(|subpixels| {
        let height = (subpixels.len() / subpixels_per_row) as u32;
        RgbImageView::from_raw(width, height, subpixels).expect("Should never fail")
    })
}

/// Render the z-slice of index `z` of a masked potential field
///
/// Image columns map to the x axis and rows to the y axis, so the image must
/// be `width` pixels wide and `height` pixels high. `range` holds the resting
/// and excited potentials, which are mapped to the ends of the gradient.
pub fn render_slice(
    potential: ScalarFieldView<'_>,
    z: usize,
    range: [Precision; 2],
    image: &mut RgbImage,
) {
    let slice = potential.index_axis(Axis(2), z);
    assert_eq!(
        [image.width() as usize, image.height() as usize],
        [slice.dim().0, slice.dim().1],
        "Image should have the shape of the potential slice"
    );
    rayon::iter::split((0, image_view(image)), |(first_row, view)| {
        if view.height() <= MIN_ROWS_PER_TASK {
            ((first_row, view), None)
        } else {
            let mid = view.height() / 2;
            let [top, bottom] = vsplit_image(view, mid);
            ((first_row, top), Some((first_row + mid, bottom)))
        }
    })
    .for_each(|(first_row, mut view)| {
        for (x, row, pixel) in view.enumerate_pixels_mut() {
            let y = first_row + row;
            *pixel = Rgb(ui::potential_color(slice[[x as usize, y as usize]], range));
        }
    });
}
