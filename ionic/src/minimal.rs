//! Four-variable minimal model of ventricular action potentials
//!
//! This is the phenomenological model of Bueno-Orovio, Cherry and Fenton,
//! which reproduces the action potential morphology of human ventricular
//! cells with three gating variables and three lumped currents:
//!
//! - A fast inward current `J_fi`, gated by V, which drives the upstroke.
//! - A slow outward current `J_so`, which drives repolarization.
//! - A slow inward current `J_si`, gated by W and S, which sustains the plateau.

use crate::{IonicModel, Variables};
use data::Precision;

/// Four-variable minimal model
///
/// Parameter names follow Bueno-Orovio, Cherry and Fenton (2008). Default
/// values describe epicardial cells.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct MinimalModel {
    /// Resting potential
    pub u_o: Precision,

    /// Upper potential bound of the fast inward current
    pub u_u: Precision,

    /// Activation threshold of the fast inward current
    pub theta_v: Precision,

    /// Activation threshold of the slow currents
    pub theta_w: Precision,

    /// Threshold between the two V recovery time constants
    pub theta_v_minus: Precision,

    /// Threshold between the two resting time constants
    pub theta_o: Precision,

    /// V recovery time constant below `theta_v_minus`
    pub tau_v1_minus: Precision,

    /// V recovery time constant above `theta_v_minus`
    pub tau_v2_minus: Precision,

    /// V inactivation time constant
    pub tau_v_plus: Precision,

    /// W recovery time constant at low potential
    pub tau_w1_minus: Precision,

    /// W recovery time constant at high potential
    pub tau_w2_minus: Precision,

    /// Steepness of the W recovery time constant transition
    pub k_w_minus: Precision,

    /// Midpoint of the W recovery time constant transition
    pub u_w_minus: Precision,

    /// W inactivation time constant
    pub tau_w_plus: Precision,

    /// Fast inward current time constant
    pub tau_fi: Precision,

    /// Resting time constant below `theta_o`
    pub tau_o1: Precision,

    /// Resting time constant above `theta_o`
    pub tau_o2: Precision,

    /// Slow outward time constant at low potential
    pub tau_so1: Precision,

    /// Slow outward time constant at high potential
    pub tau_so2: Precision,

    /// Steepness of the slow outward time constant transition
    pub k_so: Precision,

    /// Midpoint of the slow outward time constant transition
    pub u_so: Precision,

    /// S time constant below `theta_w`
    pub tau_s1: Precision,

    /// S time constant above `theta_w`
    pub tau_s2: Precision,

    /// Steepness of the S steady state
    pub k_s: Precision,

    /// Midpoint of the S steady state
    pub u_s: Precision,

    /// Slow inward current time constant
    pub tau_si: Precision,

    /// Slope of the W steady state below `theta_o`
    pub tau_w_inf: Precision,

    /// W steady state above `theta_o`
    pub w_inf_star: Precision,
}
//
impl Default for MinimalModel {
    fn default() -> Self {
        Self::epicardium()
    }
}
//
impl MinimalModel {
    /// Parameters fitted to human epicardial cells
    pub fn epicardium() -> Self {
        Self {
            u_o: 0.0,
            u_u: 1.55,
            theta_v: 0.3,
            theta_w: 0.13,
            theta_v_minus: 0.006,
            theta_o: 0.006,
            tau_v1_minus: 60.0,
            tau_v2_minus: 1150.0,
            tau_v_plus: 1.4506,
            tau_w1_minus: 60.0,
            tau_w2_minus: 15.0,
            k_w_minus: 65.0,
            u_w_minus: 0.03,
            tau_w_plus: 200.0,
            tau_fi: 0.11,
            tau_o1: 400.0,
            tau_o2: 6.0,
            tau_so1: 30.0181,
            tau_so2: 0.9957,
            k_so: 2.0458,
            u_so: 0.65,
            tau_s1: 2.7342,
            tau_s2: 16.0,
            k_s: 2.0994,
            u_s: 0.9087,
            tau_si: 1.8875,
            tau_w_inf: 0.07,
            w_inf_star: 0.94,
        }
    }
}
//
impl IonicModel for MinimalModel {
    #[inline]
    fn differentiate(&self, Variables { u, v, w, s }: Variables) -> Variables {
        let p = self;

        // Gates
        let h_v = heaviside(u - p.theta_v);
        let h_w = heaviside(u - p.theta_w);
        let h_v_minus = heaviside(u - p.theta_v_minus);
        let h_o = heaviside(u - p.theta_o);

        // Potential-dependent time constants and steady states
        let tau_v_minus = (1.0 - h_v_minus) * p.tau_v1_minus + h_v_minus * p.tau_v2_minus;
        let tau_w_minus = p.tau_w1_minus
            + (p.tau_w2_minus - p.tau_w1_minus) * sigmoid(p.k_w_minus * (u - p.u_w_minus));
        let tau_so = p.tau_so1 + (p.tau_so2 - p.tau_so1) * sigmoid(p.k_so * (u - p.u_so));
        let tau_s = (1.0 - h_w) * p.tau_s1 + h_w * p.tau_s2;
        let tau_o = (1.0 - h_o) * p.tau_o1 + h_o * p.tau_o2;
        let v_inf = 1.0 - h_v_minus;
        let w_inf = (1.0 - h_o) * (1.0 - u / p.tau_w_inf) + h_o * p.w_inf_star;

        // Currents
        let j_fi = -v * h_v * (u - p.theta_v) * (p.u_u - u) / p.tau_fi;
        let j_so = (u - p.u_o) * (1.0 - h_w) / tau_o + h_w / tau_so;
        let j_si = -h_w * w * s / p.tau_si;

        Variables {
            u: -(j_fi + j_so + j_si),
            v: (1.0 - h_v) * (v_inf - v) / tau_v_minus - h_v * v / p.tau_v_plus,
            w: (1.0 - h_w) * (w_inf - w) / tau_w_minus - h_w * w / p.tau_w_plus,
            s: (sigmoid(p.k_s * (u - p.u_s)) - s) / tau_s,
        }
    }
}

/// Heaviside step function
#[inline]
fn heaviside(x: Precision) -> Precision {
    if x > 0.0 {
        1.0
    } else {
        0.0
    }
}

/// Smooth step from 0 to 1, centered on 0
#[inline]
fn sigmoid(x: Precision) -> Precision {
    (1.0 + x.tanh()) / 2.0
}
