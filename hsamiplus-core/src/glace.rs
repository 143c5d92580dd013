//! Reservoir ice: Stefan degree-day model and MyLake energy-balance model.

use crate::inputs::{Een, GlaceReservoir, MeteoRow, Modules, Physio};
use crate::parameter::Parameters;
use crate::state::State;

const DENSITE_GLACE: f64 = 0.916; // t/m^3, ice density used to convert depth to water-equivalent depth
const K_GLACE: f64 = 2.24; // ice thermal conductivity, W/(m.degC)
const RHO_I: f64 = 916.0; // kg/m^3
const RHO_W: f64 = 1000.0; // kg/m^3
const L_FUSION: f64 = 3.34e5; // J/kg, latent heat of fusion
const C_I: f64 = 2093.4; // J/(kg.degC), specific heat of ice
const C_W: f64 = 4216.0; // J/(kg.degC), specific heat of liquid water
const HIVERGLACIO: f64 = -200.0;
const NBJ: f64 = 21.0;

/// Exchange terms returned to the driver: shelf ice released to open water
/// and snow transferred to/from the flooded shore, both in cm (basin-area
/// weighted).
#[derive(Debug, Clone, Copy, Default)]
pub struct GlaceExchange {
    pub glace_vers_reservoir: f64,
    pub bassin_vers_reservoir: f64,
}

/// Thermal conductivity of snow (W/(m.K)) from its density (kg/m^3), a
/// quartic fit used by the MyLake branch to estimate ice temperature under a
/// snow cover.
fn conductivite_neige(densite: f64) -> f64 {
    const D0: f64 = 0.36969;
    const D1: f64 = 1.58688e-3;
    const D2: f64 = 3.02462e-6;
    const D3: f64 = 5.19756e-9;
    const D4: f64 = 1.56984e-11;

    let p0 = 1.0;
    let p1 = densite - 329.6;
    let p2 = (densite - 260.378) * p1 - 21166.4 * p0;
    let p3 = (densite - 320.69) * p2 - 24555.8 * p1;
    let p4 = (densite - 263.363) * p3 - 11739.3 * p2;

    D0 * p0 + D1 * p1 + D2 * p2 + D3 * p3 + D4 * p4
}

/// Deposit ice water-equivalent into `eeg[prev+1..=new]` when the ice area
/// grows, or release (sum and zero) `eeg[new+1..=prev]` when it shrinks
/// `eeg` stays non-negative throughout. Returns the
/// water-equivalent depth (cm) released this step.
fn deposit_release(eeg: &mut [f64], prev_area: i64, new_area: i64, depth_equiv_cm: f64) -> f64 {
    if new_area > prev_area {
        let lo = prev_area.max(0) as usize;
        let hi = (new_area as usize).min(eeg.len());
        for slot in eeg.iter_mut().take(hi).skip(lo) {
            *slot = depth_equiv_cm.max(0.0);
        }
        0.0
    } else if new_area < prev_area {
        let lo = new_area.max(0) as usize;
        let hi = (prev_area as usize).min(eeg.len());
        let released: f64 = eeg.iter().take(hi).skip(lo).sum();
        for slot in eeg.iter_mut().take(hi).skip(lo) {
            *slot = 0.0;
        }
        released
    } else {
        0.0
    }
}

fn recompute_ratios(state: &mut State, superficie: [f64; 2]) -> f64 {
    let new_ratio_reservoir = if superficie[0] > 0.0 { state.reservoir_superficie / superficie[0] } else { 0.0 };
    let delta = new_ratio_reservoir - state.ratio_reservoir;
    state.ratio_reservoir = new_ratio_reservoir;
    state.ratio_bassin = 1.0 - state.ratio_reservoir;
    state.ratio_fixe = if superficie[0] > 0.0 { 1.0 - superficie[1] / superficie[0] } else { 1.0 };
    delta
}

/// The reservoir's open-water surface for this step: a storage curve
/// evaluated at `niveau` when a level is supplied, otherwise unchanged from
/// the previous step.
fn superficie_reservoir(physio: &Physio, state: &State, niveau: Option<f64>) -> f64 {
    match niveau {
        Some(n) => physio.coeff[0] * n * n + physio.coeff[1] * n + physio.coeff[2],
        None => state.reservoir_superficie,
    }
}

/// Advance the reservoir-ice state by one step.
pub fn hsami_glace(modules: &Modules, physio: &Physio, param: &Parameters, superficie: [f64; 2], state: &mut State, reservoir_meteo: Option<MeteoRow>, niveau: Option<f64>) -> GlaceExchange {
    if !modules.reservoir {
        state.reservoir_epaisseur_glace = 0.0;
        state.reservoir_superficie_glace = 0.0;
        state.ratio_reservoir = 0.0;
        state.ratio_bassin = 1.0;
        state.ratio_fixe = 1.0;
        return GlaceExchange::default();
    }

    let Some(meteo) = reservoir_meteo else {
        state.reservoir_epaisseur_glace = 0.0;
        state.reservoir_superficie_glace = 0.0;
        state.reservoir_superficie = superficie_reservoir(physio, state, niveau);
        recompute_ratios(state, superficie);
        return GlaceExchange::default();
    };

    let prev_area_glace = state.reservoir_superficie_glace.round() as i64;
    let superficie_reservoir_new = superficie_reservoir(physio, state, niveau);
    let mut exchange = GlaceExchange::default();

    match modules.glace_reservoir {
        GlaceReservoir::None => {
            state.reservoir_superficie = superficie_reservoir_new;
        }

        GlaceReservoir::Stefan => {
            let moyenne_gel_raw = (meteo.tmin + meteo.tmax / 2.0) / 2.0;
            let moyenne_gel = moyenne_gel_raw.min(0.0);
            state.cumdeg_gel += moyenne_gel;

            if state.cumdeg_gel < state.obj_gel {
                let epaisseur_m = param.stefan_k() * (state.cumdeg_gel - state.obj_gel).abs().sqrt() / 100.0;

                if state.reservoir_epaisseur_glace == 0.0 {
                    state.reservoir_superficie_ref = state.reservoir_superficie;
                }
                if moyenne_gel == 0.0 {
                    state.dernier_gel += 1.0;
                } else {
                    state.dernier_gel = 0.0;
                }
                if state.dernier_gel >= NBJ {
                    state.obj_gel = HIVERGLACIO + state.cumdeg_gel;
                }

                state.reservoir_superficie_glace = (state.reservoir_superficie_ref - superficie_reservoir_new).max(0.0).round();
                state.reservoir_epaisseur_glace = epaisseur_m * 100.0;
            } else {
                state.reservoir_superficie_glace = 0.0;
                state.reservoir_epaisseur_glace = 0.0;
            }
            state.reservoir_superficie = superficie_reservoir_new;

            let new_area = state.reservoir_superficie_glace.round() as i64;
            let depth_equiv_cm = state.reservoir_epaisseur_glace * DENSITE_GLACE;
            let released_cm = deposit_release(&mut state.eeg, prev_area_glace, new_area, depth_equiv_cm);
            let deposited_cm = if new_area > prev_area_glace { depth_equiv_cm * (new_area - prev_area_glace) as f64 } else { 0.0 };
            exchange.glace_vers_reservoir = released_cm - deposited_cm;
        }

        GlaceReservoir::MyLake => {
            let banded = state.banded.as_ref().expect("mylake requires banded snow state, enforced at configuration time");
            let couvert = *banded.couvert_neige.last().expect("banded snow has at least one band");
            let dennei = *banded.densite_neige.last().expect("banded snow has at least one band");

            let h_ice_prev = state.reservoir_epaisseur_glace / 100.0;
            if h_ice_prev == 0.0 {
                state.reservoir_superficie_ref = state.reservoir_superficie;
            }

            let ta = (meteo.tmin + meteo.tmax / 2.0) / 2.0;

            let conduction_ratio = |h_ice: f64| -> f64 {
                if couvert > 0.0 {
                    let k_s = conductivite_neige(dennei * RHO_W);
                    K_GLACE * couvert / (k_s * h_ice)
                } else {
                    1.0 / (10.0 * h_ice)
                }
            };

            let (h_ice_computed, energie) = if ta <= 0.0 {
                let ti = if h_ice_prev > 0.0 { ta / (1.0 + conduction_ratio(h_ice_prev)) } else { ta };
                let growth_sq = h_ice_prev.powi(2) + 2.0 * K_GLACE * 86400.0 * (-ti) / (RHO_I * L_FUSION);
                if growth_sq < 0.0 {
                    (0.0, 0.0)
                } else {
                    let h = growth_sq.sqrt();
                    if h == 0.0 { (0.0, 0.0) } else { (h, ti * h * RHO_I * C_I) }
                }
            } else if h_ice_prev > 0.0 {
                let ti = ta / (1.0 + conduction_ratio(h_ice_prev));
                let mut e = ti * h_ice_prev * RHO_I * C_I;

                if couvert == 0.0 {
                    e += (meteo.rain_cm / 100.0) * RHO_W * (L_FUSION + C_W * ta);

                    let indice_radiation = (1.15 - 0.4 * (-0.38 * state.derniere_neige).exp()) * (meteo.sunshine_fraction / 0.52).powf(0.33);
                    let albedo = 0.33;
                    let taux_fonte = match modules.een {
                        Een::Alt => param.taux_fonte_jour() / 100.0,
                        Een::Mdj => {
                            let n = physio.occupation.iter().filter(|&&v| v != 0.0).count();
                            1.5 * param.taux_fonte_milieu(n.saturating_sub(1)) / 100.0
                        }
                        Een::Hsami | Een::Dj => 0.0,
                    };
                    let potentiel_fonte = taux_fonte * ta * indice_radiation * (1.0 - albedo);
                    e += potentiel_fonte * RHO_W * L_FUSION;
                    e += 0.5 * 86400.0;

                    let h = if e > 0.0 { (h_ice_prev - e / (L_FUSION * RHO_W)).max(0.0) } else { h_ice_prev };
                    (h, e)
                } else {
                    (h_ice_prev, e)
                }
            } else {
                (0.0, 0.0)
            };

            let h_ice_new = if h_ice_computed.is_finite() { h_ice_computed } else { 0.0 };

            state.reservoir_epaisseur_glace = h_ice_new * 100.0;
            state.reservoir_superficie_glace = (state.reservoir_superficie_ref - superficie_reservoir_new).max(0.0).round();
            state.reservoir_energie_glace = energie;
            state.reservoir_superficie = superficie_reservoir_new;

            let new_area = state.reservoir_superficie_glace.round() as i64;
            let depth_equiv_cm = state.reservoir_epaisseur_glace * DENSITE_GLACE;
            exchange.glace_vers_reservoir = deposit_release(&mut state.eeg, prev_area_glace, new_area, depth_equiv_cm);
        }
    }

    let delta_ratio_reservoir = recompute_ratios(state, superficie);
    exchange.bassin_vers_reservoir = delta_ratio_reservoir * state.neige_au_sol;

    exchange
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inputs::{EtpFormula, Infiltration, QBase, Radiation, Sol};

    fn param() -> Parameters {
        let mut values = [0.1_f64; 50];
        values[23] = 80.0;
        values[25] = -50.0; // wetting-front matric potential is non-positive
        values[46] = 0.7; // stefan_k
        Parameters::new(&values).unwrap()
    }

    fn physio() -> Physio {
        Physio {
            latitude: 46.0_f64.to_radians(),
            altitude: 200.0,
            albedo_sol: 0.2,
            i_orientation_bv: 1,
            pente_bv: 0.02,
            occupation: vec![1.0],
            occupation_bande: vec![1.0],
            altitude_bande: vec![200.0],
            coeff: [0.0, 0.0, 438.0],
            samax: 0.0,
            niveau: None,
        }
    }

    fn modules(reservoir: bool, glace: GlaceReservoir) -> Modules {
        Modules {
            etp_bassin: EtpFormula::Hsami,
            etp_reservoir: EtpFormula::Hsami,
            een: Een::Hsami,
            infiltration: Infiltration::Hsami,
            sol: Sol::Hsami,
            qbase: QBase::Hsami,
            radiation: Radiation::Hsami,
            reservoir,
            mhumide: false,
            glace_reservoir: glace,
        }
    }

    fn base_state() -> State {
        State {
            eau_hydrogrammes: ndarray::Array2::zeros((1, 3)),
            neige_au_sol: 0.0,
            fonte: 0.0,
            nas_tot: 0.0,
            fonte_tot: 0.0,
            derniere_neige: 0.0,
            gel: 0.0,
            sol: crate::state::SoilMoisture::OneLayer(0.0),
            nappe: 0.0,
            reserve: 0.0,
            banded: None,
            mh_surf: 1.0,
            mh_vol: 0.0,
            ratio_mh: 0.0,
            mhumide: 0.0,
            ratio_qbase: 0.0,
            cumdeg_gel: -530.22,
            obj_gel: -200.0,
            dernier_gel: 0.0,
            reservoir_epaisseur_glace: 0.0,
            reservoir_energie_glace: 0.0,
            reservoir_superficie: 438.0,
            reservoir_superficie_glace: 0.0,
            reservoir_superficie_ref: 438.0,
            eeg: vec![0.0; 5000],
            ratio_bassin: 1.0,
            ratio_reservoir: 0.0,
            ratio_fixe: 1.0,
        }
    }

    #[test]
    fn no_reservoir_zeroes_ice_state() {
        let mut state = base_state();
        hsami_glace(&modules(false, GlaceReservoir::None), &physio(), &param(), [100.0, 0.0], &mut state, None, None);
        assert_eq!(state.ratio_reservoir, 0.0);
        assert_eq!(state.ratio_bassin, 1.0);
    }

    #[test]
    fn stefan_first_freezing_step_grows_ice() {
        let mut state = base_state();
        let meteo = MeteoRow::new(-15.3, -1.9, 0.0, 0.0, Some(0.5), None);
        hsami_glace(&modules(true, GlaceReservoir::Stefan), &physio(), &param(), [1000.0, 438.0], &mut state, Some(meteo), None);
        assert!(state.reservoir_epaisseur_glace > 0.0);
    }

    #[test]
    fn stefan_above_objective_keeps_ice_at_zero() {
        let mut state = base_state();
        state.cumdeg_gel = 0.0;
        state.obj_gel = -200.0;
        let meteo = MeteoRow::new(5.0, 10.0, 0.0, 0.0, Some(0.5), None);
        hsami_glace(&modules(true, GlaceReservoir::Stefan), &physio(), &param(), [1000.0, 438.0], &mut state, Some(meteo), None);
        assert_eq!(state.reservoir_epaisseur_glace, 0.0);
    }

    #[test]
    fn eeg_is_never_negative() {
        let mut state = base_state();
        let meteo = MeteoRow::new(-15.3, -1.9, 0.0, 0.0, Some(0.5), None);
        hsami_glace(&modules(true, GlaceReservoir::Stefan), &physio(), &param(), [1000.0, 438.0], &mut state, Some(meteo), None);
        assert!(state.eeg.iter().all(|&v| v >= 0.0));
    }

    #[test]
    fn mylake_grows_ice_from_bare_water_when_cold() {
        let mut state = base_state();
        state.banded = Some(crate::state::BandedSnow::new(1));
        let meteo = MeteoRow::new(-20.0, -10.0, 0.0, 0.0, Some(0.5), None);
        hsami_glace(&modules(true, GlaceReservoir::MyLake), &physio(), &param(), [1000.0, 438.0], &mut state, Some(meteo), None);
        assert!(state.reservoir_epaisseur_glace > 0.0);
    }
}
