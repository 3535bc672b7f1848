//! State variables of the tissue model

use crate::{
    geometry::Domain,
    grid::{Grid, ShapeMismatch},
    parameters::Parameters,
    ScalarField, ScalarFieldView, ScalarFieldViewMut,
};
use ndarray::{s, Zip};

/// Names of the state variables, in storage order
pub const VARIABLE_NAMES: [&str; 4] = ["U", "V", "W", "S"];

/// Thickness of the potential slab that is initially excited
const SEED_THICKNESS: usize = 2;

/// Half-thickness of the excited z-slab used with loaded geometries
const SEED_HALF_DEPTH: usize = 10;

/// State of the tissue: membrane potential U and the V, W and S gates
///
/// Every variable is double-buffered. Simulation steps read the input buffers
/// and write the output buffers, then [`State::flip()`] makes the outputs
/// become the new inputs. Outside of a step, the input buffers hold the
/// current state and the output buffers hold nothing of interest.
#[derive(Clone, Debug)]
pub struct State {
    /// Membrane potential
    u: Evolving,

    /// Fast gating variable
    v: Evolving,

    /// Slow gating variable
    w: Evolving,

    /// Slow recovery variable
    s: Evolving,
}
//
impl State {
    /// Set up state storage from initial values of U, V, W and S
    pub fn new(grid: &Grid, [u, v, w, s]: [ScalarField; 4]) -> Result<Self, ShapeMismatch> {
        for (name, field) in VARIABLE_NAMES.into_iter().zip([&u, &v, &w, &s]) {
            grid.check(name, field.shape())?;
        }
        Ok(Self {
            u: Evolving::new(u),
            v: Evolving::new(v),
            w: Evolving::new(w),
            s: Evolving::new(s),
        })
    }

    /// Set up a tissue at rest with a given potential
    ///
    /// The V and W gates are open (1.0) and the S variable is at 0.0.
    pub fn resting(grid: &Grid, u: ScalarField) -> Result<Self, ShapeMismatch> {
        Self::new(grid, [u, grid.filled(1.0), grid.filled(1.0), grid.zeros()])
    }

    /// Set up the initial state of a simulation
    ///
    /// The tissue is at rest, except for an excited slab of potential: the
    /// middle z-slab of a loaded geometry, or the first x-slab of a
    /// geometry-less box. Outside of the tissue, the potential is at rest.
    pub fn initial(domain: &Domain, params: &Parameters) -> Self {
        let grid = domain.grid();
        let [width, _height, depth] = grid.shape();
        let mut u = grid.filled(params.min_v);
        if params.geometry_file.is_some() {
            let start = (depth / 2).saturating_sub(SEED_HALF_DEPTH);
            let end = (depth / 2 + SEED_HALF_DEPTH).min(depth);
            u.slice_mut(s![.., .., start..end]).fill(params.max_v);
        } else {
            u.slice_mut(s![..SEED_THICKNESS.min(width), .., ..])
                .fill(params.max_v);
        }
        Zip::from(&mut u).and(domain.mask()).for_each(|u, &m| {
            if m <= 0.0 {
                *u = params.min_v;
            }
        });
        Self::resting(grid, u).expect("Fields were built from the domain's grid")
    }

    /// Shape of the state fields
    pub fn shape(&self) -> [usize; 3] {
        self.u.shape()
    }

    /// Current value of U, V, W and S
    pub fn current(&self) -> [&ScalarField; 4] {
        [
            self.u.input(),
            self.v.input(),
            self.w.input(),
            self.s.input(),
        ]
    }

    /// Current membrane potential
    pub fn potential(&self) -> &ScalarField {
        self.u.input()
    }

    /// Extract the current value of U, V, W and S
    pub fn into_current(self) -> [ScalarField; 4] {
        [self.u, self.v, self.w, self.s].map(Evolving::into_input)
    }

    /// Access the input and output buffers of U, V, W and S
    pub fn in_out(&mut self) -> ([ScalarFieldView<'_>; 4], [ScalarFieldViewMut<'_>; 4]) {
        let (in_u, out_u) = self.u.in_out();
        let (in_v, out_v) = self.v.in_out();
        let (in_w, out_w) = self.w.in_out();
        let (in_s, out_s) = self.s.in_out();
        (
            [in_u.view(), in_v.view(), in_w.view(), in_s.view()],
            [
                out_u.view_mut(),
                out_v.view_mut(),
                out_w.view_mut(),
                out_s.view_mut(),
            ],
        )
    }

    /// Access the output buffer of the potential
    ///
    /// This is where forcing terms go once a step has been computed.
    pub fn output_potential_mut(&mut self) -> &mut ScalarField {
        self.u.out()
    }

    /// Make the output state become the input one
    pub fn flip(&mut self) {
        self.u.flip();
        self.v.flip();
        self.w.flip();
        self.s.flip();
    }

    /// Check that every buffer is defined on a certain grid
    pub fn check(&self, grid: &Grid) -> Result<(), ShapeMismatch> {
        let variables = [&self.u, &self.v, &self.w, &self.s];
        for (name, evolving) in VARIABLE_NAMES.into_iter().zip(variables) {
            for field in &evolving.0 {
                grid.check(name, field.shape())?;
            }
        }
        Ok(())
    }

    /// Truth that all current values are finite
    pub fn is_finite(&self) -> bool {
        self.current()
            .iter()
            .all(|field| field.iter().all(|x| x.is_finite()))
    }
}

/// Pair of fields where one acts as an input and the other as an output
#[derive(Clone, Debug, PartialEq)]
struct Evolving([ScalarField; 2]);
//
impl Evolving {
    /// Set up storage with a certain input
    fn new(input: ScalarField) -> Self {
        let output = ScalarField::zeros(input.raw_dim());
        Self([input, output])
    }

    /// Access the input field
    fn input(&self) -> &ScalarField {
        &self.0[0]
    }

    /// Access the input and output fields
    fn in_out(&mut self) -> (&ScalarField, &mut ScalarField) {
        let [input, output] = &mut self.0;
        (input, output)
    }

    /// Access the output field
    fn out(&mut self) -> &mut ScalarField {
        &mut self.0[1]
    }

    /// Check the shape of the fields
    fn shape(&self) -> [usize; 3] {
        self.0[0].dim().into()
    }

    /// Extract the input field
    fn into_input(self) -> ScalarField {
        let [input, _output] = self.0;
        input
    }

    /// Make the output field become the input one
    fn flip(&mut self) {
        let [input, output] = &mut self.0;
        std::mem::swap(input, output);
    }
}
