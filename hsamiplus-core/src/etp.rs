//! Potential evapotranspiration: thirteen daily formulas plus the fixed
//! 24-hour sub-daily weighting. Ported formula-for-formula from
//! `hsami_etp.py` (see DESIGN.md) since the source fixes constants a
//! one-line formula summary would leave implicit.

use crate::inputs::EtpFormula;
use std::f64::consts::PI;

/// Fixed hourly PET-distribution weights (sums to 100), `hsami_etp.py`'s
/// `poids` array.
pub const POIDS: [f64; 24] = [
    0.5, 0.5, 0.5, 0.5, 0.5, 0.6, 1.1, 2.4, 4.0, 5.4, 7.0, 8.4, 9.6, 10.4, 10.9, 10.8, 9.9, 7.8, 5.0, 2.0, 0.7, 0.5, 0.5, 0.5,
];

/// Fraction of the daily PET that falls within step `pas` of `nb_pas` equal
/// divisions of the day. `debut`/`fin` truncate like the source's
/// `int(...)`, not round.
pub fn step_weight(nb_pas: u32, pas: u32) -> f64 {
    debug_assert!((1..=nb_pas).contains(&pas));
    let debut = ((pas - 1) as f64 * 24.0 / nb_pas as f64) as usize;
    let fin = (pas as f64 * 24.0 / nb_pas as f64) as usize;
    let fin = fin.min(24);
    POIDS[debut.min(24)..fin].iter().sum::<f64>() / 100.0
}

/// `etp_declinaison`: solar declination (radians) used by day-length and
/// `mohyse`. Distinct from, and numerically close to, the declination used
/// inside `etp_rayonnement_et` below — the source keeps two approximations.
fn declinaison(jj: f64) -> f64 {
    0.41 * ((jj - 80.0) / 365.0 * 2.0 * PI).sin()
}

/// `etp_duree_jour`: day length (hours) at Julian day `jj`, latitude `lat`
/// (radians).
fn duree_jour(jj: f64, lat: f64) -> f64 {
    let delta = declinaison(jj);
    let ws = (-lat.tan() * delta.tan()).acos();
    24.0 / PI * ws
}

/// `etp_p`: the day's share of the year's total day-length hours, as a
/// percentage (`blaney_criddle`, `kharrufa`). Recomputes the full 366-day
/// day-length array on every call, as the source does.
fn p_jour(lat: f64, jj: u32) -> f64 {
    let mut dl = [0.0_f64; 366];
    for (jj2, slot) in dl.iter_mut().enumerate() {
        *slot = duree_jour(jj2 as f64, lat);
    }
    let total: f64 = dl.iter().sum();
    let idx = (jj as usize).min(365);
    100.0 * dl[idx] / total
}

/// `etp_e`: saturation vapour pressure (kPa) at temperature `t` (°C).
fn e(t: f64) -> f64 {
    0.6108 * (17.27 * t / (t + 237.3)).exp()
}

/// `etp_td_linacre`: Linacre's dew-point estimate.
fn td_linacre(tmax: f64, tmin: f64) -> f64 {
    0.38 + tmax - 0.018 * tmax.powi(2) + 1.4 + tmin - 5.0
}

/// `etp_rayonnement_et`: extraterrestrial radiation (MJ/m²/day). Uses its
/// own declination approximation, distinct from [`declinaison`].
fn rayonnement_et(lat: f64, jj: f64) -> f64 {
    const GSC: f64 = 0.0820;
    let dr = 1.0 + 0.033 * (2.0 * PI / 365.0 * jj).cos();
    let delta = 0.409 * (2.0 * PI * jj / 365.0 - 1.39).sin();
    let ws = (-lat.tan() * delta.tan()).acos();
    24.0 * 60.0 / PI * GSC * dr * (ws * lat.sin() * delta.sin() + lat.cos() * delta.cos() * ws.sin())
}

/// `etp_rayonnement_g`: global radiation (MJ/m²/day), always computed via the
/// Hargreaves-Samani `Krs` branch since every call site in the source
/// supplies `t_min`/`t_max`.
fn rayonnement_g(re: f64, tmin: f64, tmax: f64) -> f64 {
    const KRS: f64 = 0.175;
    KRS * (tmax - tmin).max(0.0).sqrt() * re
}

/// `etp_rayonnement_temps_clair`: clear-sky radiation (MJ/m²/day).
fn rayonnement_temps_clair(re: f64, altitude: f64) -> f64 {
    (0.75 + 2.10e-5 * altitude) * re
}

/// `etp_rayonnement_net`: net radiation (MJ/m²/day).
fn rayonnement_net(tmin: f64, tmax: f64, rg: f64, rgo: f64, albedo: f64) -> f64 {
    const SIGMA: f64 = 4.903e-9;
    const K: f64 = 273.16;
    let rns = rg * (1.0 - albedo);
    let ea = e(tmin);
    let rapport = if rgo > 0.0 { (rg / rgo).min(1.0) } else { 1.0 };
    let rnl = SIGMA * ((tmax + K).powi(4) + (tmin + K).powi(4)) / 2.0 * (0.34 - 0.14 * ea.sqrt()) * (1.35 * rapport - 0.35);
    rns - rnl
}

/// `etp_m_courbe_pression`: slope of the saturation vapour-pressure curve
/// (kPa/°C).
fn m_courbe_pression(tmin: f64, tmax: f64) -> f64 {
    let ta = (tmin + tmax) / 2.0;
    4098.0 * e(ta) / (237.3 + ta).powi(2)
}

/// `etp_chaleur_lat_vaporisation`: latent heat of vaporisation (MJ/kg).
fn chaleur_lat_vaporisation(tmin: f64, tmax: f64) -> f64 {
    let ta = (tmin + tmax) / 2.0;
    2.5 - 2.36e-3 * ta
}

/// Daily PET in cm/day for the given formulation, floor-clamped at zero.
/// Ported term-for-term from `hsami_etp.py::hsami_etp`'s dispatch (see
/// DESIGN.md).
pub fn etp_jour(formula: EtpFormula, jj: u32, lat_rad: f64, altitude: f64, albedo: f64, tmin: f64, tmax: f64, _sunshine_fraction: f64) -> f64 {
    let jjf = jj as f64;
    let ta = (tmin + tmax) / 2.0;

    let total = match formula {
        EtpFormula::Hsami => {
            let tmin_f = tmin * 9.0 / 5.0;
            let tmax_f = tmax * 9.0 / 5.0;
            0.00065 * 2.54 * 9.0 / 5.0 * (tmax - tmin) * (0.019 * (tmin_f + tmax_f + 64.0)).exp()
        }
        EtpFormula::BlaneyCriddle => {
            let p = p_jour(lat_rad, jj);
            0.85 * p * (0.46 * ta + 8.13) / 10.0
        }
        EtpFormula::Hamon => {
            let dl = duree_jour(jjf, lat_rad);
            let es = e(ta);
            2.1 * dl.powi(2) * es / (ta + 273.3) / 10.0
        }
        EtpFormula::Linacre => {
            if ta < 0.0 {
                0.0
            } else {
                let th = ta + 0.006 * altitude;
                let td = td_linacre(tmax, tmin);
                let lat_deg = lat_rad.to_degrees();
                (500.0 * th / (100.0 - lat_deg) + 15.0 * (ta - td)) / (80.0 - ta) / 10.0
            }
        }
        EtpFormula::Kharrufa => {
            let p = p_jour(lat_rad, jj);
            let ta_pos = ta.max(0.0);
            0.34 * p * ta_pos.powf(1.3) / 10.0
        }
        EtpFormula::Mohyse => {
            let delta = declinaison(jjf);
            1.0 / PI * (-lat_rad.tan() * delta.tan()).acos() * (17.3 * ta / (238.0 + ta)).exp() / 10.0
        }
        EtpFormula::Romanenko => {
            let ea = e(ta);
            let ed = e(tmin);
            0.0045 * (1.0 + ta / 25.0).powi(2) * (1.0 - ed / ea) * 100.0
        }
        EtpFormula::Makkink => {
            let re = rayonnement_et(lat_rad, jjf);
            let rg = rayonnement_g(re, tmin, tmax);
            let m = m_courbe_pression(tmin, tmax);
            let lambda = chaleur_lat_vaporisation(tmin, tmax);
            const PSI: f64 = 0.066;
            ((m / (m + PSI)) * (0.61 * rg / lambda) - 0.12) / 10.0
        }
        EtpFormula::Turc => {
            if ta < 0.0 {
                0.0
            } else {
                let re = rayonnement_et(lat_rad, jjf);
                let rg = rayonnement_g(re, tmin, tmax);
                const K: f64 = 0.35;
                K * (rg + 2.094) * (ta / (ta + 15.0)) / 10.0
            }
        }
        EtpFormula::McGuinnessBordne => {
            let re = rayonnement_et(lat_rad, jjf);
            let rg = rayonnement_g(re, tmin, tmax);
            let lambda = chaleur_lat_vaporisation(tmin, tmax);
            const RHO_W: f64 = 1000.0;
            (rg / (lambda * RHO_W) * (ta + 5.0) / 68.0) * 100.0
        }
        EtpFormula::Abtew => {
            if ta < 0.0 {
                0.0
            } else {
                let re = rayonnement_et(lat_rad, jjf);
                let rg = rayonnement_g(re, tmin, tmax);
                let lambda = chaleur_lat_vaporisation(tmin, tmax);
                0.53 * rg / lambda / 10.0
            }
        }
        EtpFormula::Hargreaves => {
            if tmax - tmin < 0.0 {
                0.0
            } else {
                let re = rayonnement_et(lat_rad, jjf);
                0.0135 * (0.16 * re * (tmax - tmin).sqrt()) * 0.4082 * (ta + 17.8) / 10.0
            }
        }
        EtpFormula::PriestleyTaylor => {
            let re = rayonnement_et(lat_rad, jjf);
            let rg = rayonnement_g(re, tmin, tmax);
            let rgo = rayonnement_temps_clair(re, altitude);
            let rn = rayonnement_net(tmin, tmax, rg, rgo, albedo);
            let m = m_courbe_pression(tmin, tmax);
            let lambda = chaleur_lat_vaporisation(tmin, tmax);
            const PSI: f64 = 0.066;
            const RHO_W: f64 = 1000.0;
            const CT: f64 = 1.26;
            CT * m * rn / (lambda * RHO_W * (m + PSI)) * 100.0
        }
    };
    total.max(0.0)
}

/// PET depth (cm) for one sub-daily step: the daily value times the summed
/// weights of the hours falling inside this step's hour range.
#[allow(clippy::too_many_arguments)]
pub fn etp(formula: EtpFormula, nb_pas: u32, pas: u32, jj: u32, lat_rad: f64, altitude: f64, albedo: f64, tmin: f64, tmax: f64, sunshine_fraction: f64) -> f64 {
    let daily = etp_jour(formula, jj, lat_rad, altitude, albedo, tmin, tmax, sunshine_fraction);
    (daily * step_weight(nb_pas, pas)).max(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn step_weights_sum_to_one_across_a_day() {
        let total: f64 = (1..=4).map(|pas| step_weight(4, pas)).sum();
        assert!((total - 1.0).abs() < 1e-9);
    }

    #[test]
    fn single_step_per_day_captures_the_full_weight() {
        assert!((step_weight(1, 1) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn hsami_pet_is_never_negative() {
        let v = etp_jour(EtpFormula::Hsami, 150, 47.1943_f64.to_radians(), 390.9, 0.7, -30.0, -20.0, 0.5);
        assert!(v >= 0.0);
    }

    #[test]
    fn hsami_matches_its_own_closed_form() {
        let (tmin, tmax, jj) = (1.9, 15.3, 120);
        let v = etp_jour(EtpFormula::Hsami, jj, 47.1943_f64.to_radians(), 390.9, 0.7, tmin, tmax, 0.5);
        let expected = 0.00065 * 2.54 * 9.0 / 5.0 * (tmax - tmin) * (0.019 * (tmin * 9.0 / 5.0 + tmax * 9.0 / 5.0 + 64.0)).exp();
        assert!((v - expected).abs() < 1e-12);
    }

    #[test]
    fn linacre_is_zero_below_freezing_mean() {
        let v = etp_jour(EtpFormula::Linacre, 300, 47.1943_f64.to_radians(), 390.9, 0.7, -20.0, -15.0, 0.5);
        assert_eq!(v, 0.0);
    }

    #[test]
    fn priestley_taylor_is_nonnegative_on_a_mild_summer_day() {
        let v = etp_jour(EtpFormula::PriestleyTaylor, 150, 47.1943_f64.to_radians(), 390.9, 0.7, 3.3, 15.5, 0.5);
        assert!(v >= 0.0);
    }

    #[test]
    fn all_formulas_are_nonnegative_on_a_mild_day() {
        let formulas = [
            EtpFormula::Hsami,
            EtpFormula::BlaneyCriddle,
            EtpFormula::Hamon,
            EtpFormula::Linacre,
            EtpFormula::Kharrufa,
            EtpFormula::Mohyse,
            EtpFormula::Romanenko,
            EtpFormula::Makkink,
            EtpFormula::Turc,
            EtpFormula::McGuinnessBordne,
            EtpFormula::Abtew,
            EtpFormula::Hargreaves,
            EtpFormula::PriestleyTaylor,
        ];
        for f in formulas {
            let v = etp_jour(f, 180, 47.1943_f64.to_radians(), 390.9, 0.7, 10.0, 20.0, 0.5);
            assert!(v >= 0.0, "{f:?} produced a negative PET");
        }
    }
}
