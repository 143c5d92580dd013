//! Surface runoff: splits `eau_surface` into runoff and the
//! infiltration handed to `vertical.rs`.

use crate::inputs::{Infiltration, Sol};
use crate::parameter::Parameters;
use crate::state::State;

/// `(ruissellement_surface, infiltration)`, summing to `eau_surface`.
pub fn hsami_ruissellement_surface(nb_pas: u32, param: &Parameters, sol: Sol, infiltration: Infiltration, state: &State, eau_surface: f64) -> (f64, f64) {
    if matches!(infiltration, Infiltration::GreenAmpt | Infiltration::ScsCn) {
        return (0.0, eau_surface);
    }

    let sol_max = match sol {
        Sol::Hsami => param.sol_max(),
        Sol::TroisCouches => param.porosite_couche(0) * param.epaisseur_couche(0),
    };
    let sol_actuel = match sol {
        Sol::Hsami => state.sol.one_layer(),
        Sol::TroisCouches => state.sol.three_layer()[0],
    };

    let seuil = (param.seuil_min() / nb_pas as f64).max(param.effet_sol() / nb_pas as f64 * (1.0 - sol_actuel / sol_max.max(1e-9)) - param.effet_gel() * state.gel);
    let seuil = seuil.max(0.0);

    let ruissellement = if eau_surface >= seuil { eau_surface - seuil / 2.0 } else { eau_surface.powi(2) / (2.0 * seuil.max(1e-12)) };
    let ruissellement = ruissellement.clamp(0.0, eau_surface);
    (ruissellement, eau_surface - ruissellement)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::SoilMoisture;

    fn param() -> Parameters {
        let mut values = [0.1_f64; 50];
        values[10] = 0.2; // seuil_min
        values[9] = 5.0; // effet_sol
        values[12] = 20.0; // sol_max
        values[23] = 80.0;
        values[25] = -50.0; // wetting-front matric potential is non-positive
        Parameters::new(&values).unwrap()
    }

    fn state_with_sol(sol: f64) -> State {
        State {
            eau_hydrogrammes: ndarray::Array2::zeros((1, 3)),
            neige_au_sol: 0.0,
            fonte: 0.0,
            nas_tot: 0.0,
            fonte_tot: 0.0,
            derniere_neige: 0.0,
            gel: 0.0,
            sol: SoilMoisture::OneLayer(sol),
            nappe: 0.0,
            reserve: 0.0,
            banded: None,
            mh_surf: 1.0,
            mh_vol: 0.0,
            ratio_mh: 0.0,
            mhumide: 0.0,
            ratio_qbase: 0.0,
            cumdeg_gel: 0.0,
            obj_gel: -200.0,
            dernier_gel: 0.0,
            reservoir_epaisseur_glace: 0.0,
            reservoir_energie_glace: 0.0,
            reservoir_superficie: 0.0,
            reservoir_superficie_glace: 0.0,
            reservoir_superficie_ref: 0.0,
            eeg: vec![0.0; 5000],
            ratio_bassin: 1.0,
            ratio_reservoir: 0.0,
            ratio_fixe: 1.0,
        }
    }

    #[test]
    fn green_ampt_is_pass_through() {
        let p = param();
        let state = state_with_sol(5.0);
        let (runoff, infiltration) = hsami_ruissellement_surface(1, &p, Sol::Hsami, Infiltration::GreenAmpt, &state, 2.0);
        assert_eq!(runoff, 0.0);
        assert_eq!(infiltration, 2.0);
    }

    #[test]
    fn small_input_below_threshold_mostly_infiltrates() {
        let p = param();
        let state = state_with_sol(5.0);
        let (runoff, infiltration) = hsami_ruissellement_surface(1, &p, Sol::Hsami, Infiltration::Hsami, &state, 0.05);
        assert!(runoff < 0.05);
        assert!((runoff + infiltration - 0.05).abs() < 1e-9);
    }

    #[test]
    fn large_input_above_threshold_runs_off_most_of_the_excess() {
        let p = param();
        let state = state_with_sol(5.0);
        let (runoff, infiltration) = hsami_ruissellement_surface(1, &p, Sol::Hsami, Infiltration::Hsami, &state, 5.0);
        assert!(runoff > 4.0);
        assert!((runoff + infiltration - 5.0).abs() < 1e-9);
    }
}
