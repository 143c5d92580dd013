//! Vertical soil flow: one-layer and three-layer soil column
//! models, Green-Ampt and SCS-CN infiltration, and the two groundwater
//! drainage laws.

use crate::inputs::{Infiltration, QBase, Sol};
use crate::parameter::Parameters;
use crate::state::{SoilMoisture, State};
use crate::utils::brent;

/// Groundwater drainage. Returns the drained depth (cm) and
/// updates `nappe` in place, including the `nappe_max` overflow.
fn drain_nappe(qbase: QBase, param: &Parameters, nb_pas: u32, nappe: &mut f64) -> (f64, f64) {
    let drained = match qbase {
        QBase::Hsami => {
            let taux = param.taux_vidange_nappe() / nb_pas as f64;
            let d = *nappe * taux;
            *nappe -= d;
            d
        }
        QBase::Dingman => {
            let k = param.dingman_k() / nb_pas as f64;
            let sy = param.dingman_sy();
            let d = k * sy * *nappe * (-k).exp();
            *nappe -= d;
            d
        }
    };

    let overflow = (*nappe - param.nappe_max()).max(0.0);
    if overflow > 0.0 {
        *nappe = param.nappe_max();
    }
    (drained, overflow)
}

/// Green-Ampt fixed-point infiltration. Returns
/// `(infiltration, ruissellement)`.
#[allow(clippy::too_many_arguments)]
pub fn green_ampt(eau_surface: f64, ks: f64, psi: f64, sol_max: f64, sol: f64, nb_pas: u32, gel: f64, neige_au_sol: f64, porosity: Option<f64>) -> (f64, f64) {
    if eau_surface <= 0.0 {
        return (0.0, 0.0);
    }
    if eau_surface * nb_pas as f64 <= ks {
        return (eau_surface, 0.0);
    }

    let n = porosity.unwrap_or(0.45);
    let m = n * (sol_max - sol).max(0.0) / sol_max.max(1e-9);
    let k = ks / 2.0;

    let mut f = if m <= 0.0 {
        ks
    } else {
        let psi_abs = psi.abs().max(1e-9);
        let g = |f: f64| -f + k / nb_pas as f64 + psi_abs * m * (1.0 + f / (psi_abs * m)).ln();
        brent(g, 0.0, (eau_surface * nb_pas as f64).max(ks), 1e-9, 100)
    };

    if gel > 0.0 && neige_au_sol > 0.0 {
        let theta = n * sol / sol_max.max(1e-9);
        let granger_pomeroy = 5.0 * (1.0 - theta) * (neige_au_sol * 10.0).max(0.0).powf(0.584) / 10.0;
        let weight = (gel / sol_max.max(1e-9)).clamp(0.0, 1.0);
        f = f * (1.0 - weight) + granger_pomeroy * weight;
    }

    let infiltration = f.clamp(0.0, eau_surface);
    (infiltration, eau_surface - infiltration)
}

/// SCS curve-number infiltration. Returns `(infiltration, runoff)`.
pub fn scs_cn(eau_surface: f64, curve_number: f64) -> (f64, f64) {
    let s = (25400.0 / curve_number - 254.0) / 10.0;
    let threshold = 0.2 * s;
    let runoff = if eau_surface <= threshold {
        0.0
    } else {
        ((eau_surface - threshold).powi(2) / (eau_surface + 0.8 * s).max(1e-9)).min(eau_surface)
    };
    (eau_surface - runoff, runoff)
}

/// One-layer soil model. Mutates `state.sol`/`state.nappe`/
/// `state.gel`, `apport_vertical[0..=2]` and `etr[2..=3]`.
#[allow(clippy::too_many_arguments)]
fn one_layer(nb_pas: u32, param: &Parameters, infiltration_kind: Infiltration, qbase: QBase, state: &mut State, mut offre: f64, demande: f64, ruissellement_surface: f64, apport: &mut [f64; 5], etr: &mut [f64; 5]) {
    let sol_min = param.sol_min();
    let sol_max = param.sol_max();
    let portion_rs = param.portion_ruissellement_surface();
    let portion_rsmax = param.portion_ruissellement_sol_max();
    let taux_vidange_sol_min = param.taux_vidange_sol_min() / nb_pas as f64;

    let mut sol = state.sol.one_layer();

    if offre > demande {
        etr[2] = demande;
        offre -= demande;

        let inf_potentielle = match infiltration_kind {
            Infiltration::GreenAmpt => {
                let ks = 10f64.powf(param.log_ks_couche1());
                let (inf, ruiss) = green_ampt(offre, ks, param.psi(), sol_max, sol, nb_pas, state.gel, state.neige_au_sol, None);
                apport[2] = ruiss;
                inf
            }
            Infiltration::Hsami => {
                apport[2] = ruissellement_surface;
                offre
            }
            Infiltration::ScsCn => {
                let (inf, ruiss) = scs_cn(offre, param.curve_number());
                apport[2] = ruiss;
                inf
            }
        };

        apport[1] += inf_potentielle * portion_rs;
        sol += inf_potentielle * (1.0 - portion_rs);
    } else {
        etr[2] = offre;
        let ecart = offre - demande;
        let pompage = (sol - sol_min).max(0.0).min((-(sol / sol_max.max(1e-9)) * ecart).max(0.0));
        sol -= pompage;
        etr[3] = pompage;

        if matches!(infiltration_kind, Infiltration::Hsami) {
            apport[2] = ruissellement_surface;
        }
    }

    let (drained, overflow) = drain_nappe(qbase, param, nb_pas, &mut state.nappe);
    apport[0] += drained + overflow;

    let exces = (sol + state.gel - sol_max).max(0.0);
    if exces > 0.0 {
        apport[1] += exces * portion_rsmax;
        state.nappe += exces * (1.0 - portion_rsmax);
        sol = sol_max - state.gel;
    }

    if sol < 0.0 {
        state.gel += sol;
        sol = 0.0;
    }

    if sol > sol_min {
        let percolation = (sol - sol_min) * taux_vidange_sol_min;
        sol -= percolation;
        state.nappe += percolation;
    }

    state.sol = SoilMoisture::OneLayer(sol);
}

/// Three-layer soil model.
#[allow(clippy::too_many_arguments)]
fn three_layer(nb_pas: u32, param: &Parameters, qbase: QBase, state: &mut State, mut offre: f64, demande: f64, apport: &mut [f64; 5], etr: &mut [f64; 5]) {
    let b = [param.b_couche(0), param.b_couche(1)];
    let z = [param.epaisseur_couche(0), param.epaisseur_couche(1)];
    let cc = [param.cc_couche(0), param.cc_couche(1)];
    let porosite = [param.porosite_couche(0), param.porosite_couche(1)];
    let ks = [10f64.powf(param.log_ks_couche1()), 10f64.powf(param.log_ks_couche2())];
    let portion_rs = param.portion_ruissellement_surface();

    let c = [2.0 * b[0] + 3.0, 2.0 * b[1] + 3.0];
    let sol_max = [porosite[0] * z[0], porosite[1] * z[1]];
    let sol_min = [cc[0] * z[0], cc[1] * z[1]];

    let mut sol = state.sol.three_layer();

    if offre > demande {
        etr[2] = demande;
        offre -= demande;
    } else {
        etr[2] = offre;
        let ecart = offre - demande;
        let pompage = (sol[0] - sol_min[0]).max(0.0).min((-(sol[0] / sol_max[0].max(1e-9)) * ecart).max(0.0));
        sol[0] -= pompage;
        etr[3] = pompage;
        offre = 0.0;
    }

    let substeps = (24 / nb_pas).max(1);
    for _ in 0..substeps {
        let k0 = ks[0] * (sol[0] / sol_max[0].max(1e-9)).max(0.0).powf(c[0]);
        let k1 = ks[1] * (sol[1] / sol_max[1].max(1e-9)).max(0.0).powf(c[1]);
        let d0 = sol_max[0] * k0 / 24.0 / z[0].max(1e-9);
        let mut d1 = sol_max[1] * k1 / 24.0 / z[1].max(1e-9);

        let to_intermediate = d1 * portion_rs;
        apport[1] += to_intermediate;
        d1 -= to_intermediate;

        let headroom_nappe = (param.nappe_max() - state.nappe).max(0.0);
        let d1_capped = d1.min((sol[1] - sol_min[1]).max(0.0));
        let moved_to_nappe = d1_capped.min(headroom_nappe);
        apport[1] += d1_capped - moved_to_nappe;
        sol[1] -= moved_to_nappe;
        state.nappe += moved_to_nappe;

        let d0_capped = if sol[0] < sol_min[0] { 0.0 } else { d0.min((sol[0] - sol_min[0]).max(0.0)) };
        let headroom_layer2 = (sol_max[1] - sol[1]).max(0.0);
        let moved_to_layer2 = d0_capped.min(headroom_layer2);
        sol[0] -= moved_to_layer2;
        sol[1] += moved_to_layer2;
    }

    let headroom_layer1 = (sol_max[0] - sol[0]).max(0.0);
    let infiltre = offre.min(headroom_layer1);
    sol[0] += infiltre;
    apport[2] += offre - infiltre;

    let (drained, overflow) = drain_nappe(qbase, param, nb_pas, &mut state.nappe);
    apport[0] += drained;
    apport[2] += overflow;

    state.sol = SoilMoisture::ThreeLayer(sol);
}

/// Advance the vertical soil-flow state by one step.
#[allow(clippy::too_many_arguments)]
pub fn hsami_ecoulement_vertical(nb_pas: u32, param: &Parameters, sol_kind: Sol, infiltration_kind: Infiltration, qbase: QBase, state: &mut State, offre: f64, demande: f64, ruissellement_surface: f64, apport: &mut [f64; 5], etr: &mut [f64; 5]) {
    match sol_kind {
        Sol::Hsami => one_layer(nb_pas, param, infiltration_kind, qbase, state, offre, demande, ruissellement_surface, apport, etr),
        Sol::TroisCouches => three_layer(nb_pas, param, qbase, state, offre, demande, apport, etr),
    }
}
