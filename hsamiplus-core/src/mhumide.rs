//! Wetland storage: an optional lumped wet-area reservoir with a
//! nonlinear surface-volume relation, re-routing the three vertical apports.

use crate::parameter::Parameters;
use crate::state::State;
use crate::utils::round10;

/// Re-route `apport[0..=2]` through the wetland storage when
/// `modules.mhumide = 1`, depositing the wetland's own surface release into
/// `apport[5]` (the dedicated wetland-surface hydrograph feed) and
/// folding the wetland's own base-flow contribution back into `apport[0]`.
/// `samax` and `superficie_bv` are both in the project's raw units (km2-like);
/// converted to hectares internally, matching `state.mh_surf`. Returns the
/// wetland's own ET draw so the driver can fold it into the basin total.
pub fn hsami_mhumide(param: &Parameters, samax: f64, superficie_bv: f64, state: &mut State, apport: &mut [f64; 6], demande: f64) -> f64 {
    if samax <= 0.0 {
        return 0.0;
    }

    let hmax = param.mh_hmax();
    let p_norm = param.mh_p_norm();
    let ksat = 10f64.powf(param.mh_log_ksat());

    let sa_max = samax * 100.0;
    let sa = state.mh_surf;
    let sa_norm = p_norm * sa_max;

    let v_max = hmax * sa_max * 10000.0;
    let v_norm = p_norm * v_max;
    let v_min = 0.5 * v_norm;

    let alpha = (sa_max.log10() - sa_norm.log10()) / (v_max.log10() - v_norm.log10());
    let beta = sa_max / v_max.powf(alpha);

    let qb = apport[0];
    let qi = apport[1];
    let qs = apport[2];
    let vb = qb * sa * 100.0;
    let vi = qi * sa * 100.0;
    let vs = qs * sa * 100.0;

    let mut v = state.mh_vol + vb + vi + vs;

    let surface_release = if v <= v_norm {
        0.0
    } else if v <= v_max {
        (v - v_norm) / 10.0
    } else {
        (v - v_max) + (v_max - v_norm) / 10.0
    };
    v -= surface_release;

    let offre_evap = (v - v_min) / (sa * 100.0);
    let evapo = if offre_evap > demande { demande * sa * 100.0 } else { offre_evap * sa * 100.0 };
    v -= evapo;

    let demande_seep = ksat * sa * 100.0;
    let offre_seep = v - v_min;
    let seepage = if offre_seep > demande_seep { demande_seep } else { offre_seep };
    v -= seepage;

    state.mh_surf = beta * v.max(0.0).powf(alpha);
    state.mh_vol = v;

    let ratio_mh_prev = state.ratio_mh;
    let qbase_mh = round10(seepage * ratio_mh_prev / (sa * 100.0));
    let qsurf_mh = surface_release * ratio_mh_prev / (sa * 100.0);
    let etr_mh = round10(evapo * ratio_mh_prev / (sa * 100.0));

    let qbase_bv = apport[0] * (1.0 - ratio_mh_prev);
    let qintr_bv = apport[1] * (1.0 - ratio_mh_prev);
    let qsurf_bv = apport[2] * (1.0 - ratio_mh_prev);

    apport[0] = qbase_mh + qbase_bv;
    apport[1] = qintr_bv;
    apport[2] = qsurf_bv;
    apport[5] = qsurf_mh;

    state.ratio_qbase = if qbase_bv + qbase_mh != 0.0 { qbase_mh / (qbase_bv + qbase_mh) } else { 0.0 };

    state.ratio_mh = state.mh_surf / (superficie_bv * 100.0);
    state.mhumide = state.mh_vol * state.ratio_mh / (state.mh_surf * 100.0);

    etr_mh
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::SoilMoisture;

    fn param() -> Parameters {
        let mut values = [0.1_f64; 50];
        values[47] = 0.1; // mh_hmax
        values[48] = 0.1; // mh_p_norm
        values[49] = -2.0; // mh_log_ksat
        values[23] = 80.0;
        values[25] = -50.0; // wetting-front matric potential is non-positive
        Parameters::new(&values).unwrap()
    }

    fn state() -> State {
        State {
            eau_hydrogrammes: ndarray::Array2::zeros((1, 3)),
            neige_au_sol: 0.0,
            fonte: 0.0,
            nas_tot: 0.0,
            fonte_tot: 0.0,
            derniere_neige: 0.0,
            gel: 0.0,
            sol: SoilMoisture::OneLayer(5.0),
            nappe: 0.0,
            reserve: 0.0,
            banded: None,
            mh_surf: 2423.0,
            mh_vol: 2.42e7,
            ratio_mh: 0.05,
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
    fn disabled_when_sa_max_is_zero() {
        let p = param();
        let mut s = state();
        let mut apport = [0.0553, 0.1455, 0.1865, 0.7883, 0.0, 0.0];
        let evapo = hsami_mhumide(&p, 0.0, 100.0, &mut s, &mut apport, 0.1317);
        assert_eq!(evapo, 0.0);
        assert_eq!(apport, [0.0553, 0.1455, 0.1865, 0.7883, 0.0, 0.0]);
    }

    #[test]
    fn incoming_volume_is_absorbed_and_area_updates() {
        let p = param();
        let mut s = state();
        let mut apport = [0.0553, 0.1455, 0.1865, 0.7883, 0.0, 0.0];
        hsami_mhumide(&p, 242.3, 100.0, &mut s, &mut apport, 0.1317);
        assert!(s.mh_vol > 0.0);
        assert!(s.mh_surf > 0.0);
    }

    #[test]
    fn seepage_is_folded_back_into_the_base_flow_apport() {
        let p = param();
        let mut s = state();
        let mut apport = [0.0553, 0.1455, 0.1865, 0.7883, 0.0, 0.0];
        hsami_mhumide(&p, 242.3, 100.0, &mut s, &mut apport, 0.1317);
        let qbase_bv_only = 0.0553 * (1.0 - 0.05);
        assert!(apport[0] > qbase_bv_only, "qbase_mh should add on top of the scaled basin contribution");
        assert!(s.ratio_qbase > 0.0);
    }
}
