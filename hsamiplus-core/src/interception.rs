//! Interception and snowpack accounting: consumes meteorology and
//! PET demand, produces the water available for runoff/infiltration plus the
//! evapotranspiration actually realised.

use std::f64::consts::PI;

use crate::inputs::{Een, MeteoRow, Physio, Radiation};
use crate::parameter::Parameters;
use crate::state::State;
use crate::utils::erf;

const DENSITE_EAU: f64 = 1000.0; // kg/m^3
const L_FUSION: f64 = 3.34e5; // J/kg
const L_SUBLIMATION: f64 = 2.834e6; // J/kg
const K_NEIGE: f64 = 2.24; // W/(m.degC)
const CHALEUR_SPEC_GLACE: f64 = 2100.0; // J/(kg.degC)
const CHALEUR_SPEC_EAU: f64 = 4186.0; // J/(kg.degC)
const DENSITE_NEIGE_MAX: f64 = 466.0; // kg/m^3
const CONSTANTE_TASSEMENT: f64 = 0.1;
const TAUX_FONTE_NS: f64 = 0.0005; // m/day, geothermal flux under the glacier ice sheet

/// Output of one interception/snow step ("Contract").
#[derive(Debug, Clone, Copy)]
pub struct InterceptionOutput {
    pub eau_surface: f64,
    pub demande_eau: f64,
    /// `[land_sublimation, reservoir_evapo, _, _, _]`; indices 0 and 1 are
    /// produced here, index 2-3 are filled in by `vertical.rs`, index 4 is
    /// left for the wetland draw folded in by the driver.
    pub etr: [f64; 5],
    /// `[base, intermediate, surface, reservoir, ice]`.
    pub apport_vertical: [f64; 5],
}

fn gel_sol(sol: f64, gel: f64, t_moy: f64, param: &Parameters) -> (f64, f64) {
    // Freeze liquid soil water proportionally to how far below freezing the
    // day is and how much of the soil's capacity is already frozen.
    let capacite = (param.sol_max() - gel).max(0.0);
    let taux = (-t_moy / 10.0).clamp(0.0, 1.0) * param.effet_gel();
    let gele = (sol * taux).min(sol).min(capacite);
    (sol - gele, gel + gele)
}

fn degel_sol(sol: f64, gel: f64, t_moy: f64, param: &Parameters) -> (f64, f64) {
    let taux = (t_moy / 10.0).clamp(0.0, 1.0) * param.effet_sol() / 100.0;
    let degele = (gel * taux).min(gel);
    (sol + degele, gel - degele)
}

fn gel_neige(liquide: f64, solide: f64, t_moy: f64, param: &Parameters) -> (f64, f64) {
    let taux = (-t_moy / param.temperature_fonte_nuit().min(-0.1)).clamp(0.0, 1.0);
    let regele = (liquide * taux).min(liquide);
    (liquide - regele, solide + regele)
}

fn percolation_eau_fonte(liquide: f64, solide: f64, param: &Parameters) -> (f64, f64) {
    let capacite = param.capacite_retenue_neige() * solide;
    if liquide > capacite {
        (capacite, liquide - capacite)
    } else {
        (liquide, 0.0)
    }
}

/// Aspect/slope-aware radiation index: ratio of the day's insolation on
/// the inclined surface to that on a horizontal surface, analytically
/// integrated over the daylight interval clipped to this sub-daily step's
/// hour window. Built from the standard Duffie-Beckman tilted-surface
/// insolation formula rather than ported from an upstream source file — see
/// DESIGN.md.
fn calcul_indice_radiation(jj: u32, lat: f64, aspect: u8, nb_pas: u32, pas: u32, slope_deg: f64) -> f64 {
    const S0: f64 = 1376.0; // solar constant, W/m^2

    let delta = 0.41 * ((jj as f64 - 80.0) / 365.0 * 2.0 * PI).sin();
    let tan_prod = lat.tan() * delta.tan();
    let h0 = if tan_prod >= 1.0 {
        PI // polar night: sun never rises, daylight window is empty
    } else if tan_prod <= -1.0 {
        0.0 // polar day handled below via the (h2 <= h1) guard
    } else {
        (-tan_prod).acos()
    };

    let hour_start = (pas - 1) as f64 * 24.0 / nb_pas as f64;
    let hour_end = (pas as f64 * 24.0 / nb_pas as f64).min(24.0);
    let h_start = (hour_start - 12.0) * PI / 12.0;
    let h_end = (hour_end - 12.0) * PI / 12.0;
    let h1 = h_start.max(-h0);
    let h2 = h_end.min(h0);
    if h2 <= h1 {
        return 1.0;
    }

    let a_h = lat.sin() * delta.sin();
    let b_h = lat.cos() * delta.cos();
    let i_horiz = S0 * (a_h * (h2 - h1) + b_h * (h2.sin() - h1.sin()));
    if i_horiz <= 0.0 {
        return 1.0;
    }

    let gamma = aspect.saturating_sub(1) as f64 * PI / 4.0;
    let beta = slope_deg.to_radians();
    let a_i = delta.sin() * (lat.sin() * beta.cos() - lat.cos() * beta.sin() * gamma.cos());
    let b_i = delta.cos() * (lat.cos() * beta.cos() + lat.sin() * beta.sin() * gamma.cos());
    let c_i = delta.cos() * beta.sin() * gamma.sin();
    let i_incline = S0 * (a_i * (h2 - h1) + b_i * (h2.sin() - h1.sin()) - c_i * (h2.cos() - h1.cos()));

    (i_incline.max(0.0) / i_horiz).max(0.0)
}

#[allow(clippy::too_many_arguments)]
fn lumped(dj: bool, nb_pas: u32, param: &Parameters, meteo: MeteoRow, reservoir_meteo: Option<MeteoRow>, etp_bassin: f64, etp_reservoir: f64, state: &mut State) -> InterceptionOutput {
    let duree = 1.0 / nb_pas as f64;
    let mut apport = [0.0_f64; 5];
    let mut etr = [0.0_f64; 5];

    if let Some(rm) = reservoir_meteo {
        apport[3] += rm.rain_cm + rm.snow_cm;
    }

    if meteo.snow_cm <= 0.0 {
        state.derniere_neige += 1.0;
    } else {
        state.derniere_neige = 0.0;
    }

    if let Some(obs) = meteo.swe_observed {
        let delta = obs - state.nas_tot;
        state.nas_tot += delta;
        state.neige_au_sol = (state.neige_au_sol + delta).max(0.0);
    }

    let t_moy = (meteo.tmin + meteo.tmax) / 2.0;
    let dt_max = meteo.tmax - param.temperature_fonte_jour();
    let dt_min = meteo.tmin - param.temperature_fonte_nuit();

    let mut eau_surface;
    let mut demande_eau = etp_bassin;

    if dt_max < 0.0 {
        demande_eau *= param.efficacite_evapo_hiver();
        if reservoir_meteo.is_some() {
            etr[1] += (etp_reservoir * param.efficacite_evapo_hiver()).min(etp_reservoir);
        }

        state.neige_au_sol += meteo.snow_cm;
        state.nas_tot += meteo.snow_cm;
        state.fonte += meteo.rain_cm;

        let sublimation = (demande_eau).min(state.neige_au_sol);
        state.neige_au_sol -= sublimation;
        etr[0] += sublimation;
        demande_eau -= sublimation;

        let (sol, gel) = gel_sol(state.sol.one_layer(), state.gel, t_moy, param);
        state.sol = crate::state::SoilMoisture::OneLayer(sol);
        state.gel = gel;

        if state.neige_au_sol > 0.0254 {
            let (liquide, solide) = gel_neige(state.fonte, state.neige_au_sol - state.fonte, t_moy, param);
            state.fonte = liquide;
            state.neige_au_sol = solide + liquide;

            let (retenu, excedent) = percolation_eau_fonte(state.fonte, state.neige_au_sol - state.fonte, param);
            state.fonte = retenu;
            eau_surface = excedent;
        } else {
            eau_surface = 0.0;
        }
    } else {
        let (sol, gel) = degel_sol(state.sol.one_layer(), state.gel, t_moy, param);
        state.sol = crate::state::SoilMoisture::OneLayer(sol);
        state.gel = gel;

        demande_eau *= param.efficacite_evapo_ete();
        if reservoir_meteo.is_some() {
            etr[1] += (etp_reservoir * param.efficacite_evapo_ete()).min(etp_reservoir);
        }

        let mut fonte_jour = 0.0;
        if state.neige_au_sol > 0.0 {
            let sca = (param.effet_redoux_sur_aire_enneigee() * (1.0 - state.fonte_tot / state.nas_tot.max(1e-9))).clamp(0.1, 1.0);
            let radiation_index = (1.15 - 0.4 * (-0.38 * state.derniere_neige).exp()) * (meteo.sunshine_fraction / 0.52).max(0.0).powf(0.33);

            fonte_jour = dt_max.max(0.0) * sca * param.taux_fonte_jour() * radiation_index * duree + dt_min.max(0.0) * sca * param.taux_fonte_nuit() * duree;
            if t_moy > param.temperature_reference_pluie() {
                fonte_jour += 0.0126 * (t_moy - param.temperature_reference_pluie()) * sca * meteo.rain_cm;
            }
            fonte_jour = fonte_jour.min(state.neige_au_sol);
            state.fonte_tot += fonte_jour;
        }

        if dj {
            state.fonte += meteo.rain_cm;
            let liquide_disponible = state.fonte + fonte_jour;
            let solide = (state.neige_au_sol - state.fonte).max(0.0);
            let demande_restante = demande_eau;

            let from_liquide = demande_restante.min(liquide_disponible);
            let mut liquide = liquide_disponible - from_liquide;
            let mut restante = demande_restante - from_liquide;

            let from_solide = restante.min(solide);
            let mut solide = solide - from_solide;
            restante -= from_solide;

            demande_eau = restante;
            etr[0] += from_liquide + from_solide;

            let (retenu, excedent) = percolation_eau_fonte(liquide, solide, param);
            liquide = retenu;
            eau_surface = excedent;
            state.fonte = liquide;
            state.neige_au_sol = solide + liquide;
        } else {
            state.neige_au_sol += meteo.rain_cm + fonte_jour - fonte_jour;
            let lame = state.neige_au_sol.min(meteo.rain_cm + fonte_jour);
            state.neige_au_sol -= fonte_jour;
            eau_surface = lame;
            state.fonte = 0.0;
        }

        if state.neige_au_sol <= 0.0 {
            let taux = param.taux_fonte_jour().max(param.taux_fonte_nuit()) * 1.5;
            let fonte_glace = (dt_max.max(0.0) * taux * duree).min(state.eeg.iter().sum::<f64>());
            if fonte_glace > 0.0 {
                let mut remaining = fonte_glace;
                for v in state.eeg.iter_mut() {
                    if remaining <= 0.0 {
                        break;
                    }
                    let take = remaining.min(*v);
                    *v -= take;
                    remaining -= take;
                }
                apport[4] += fonte_glace - remaining;
            }
        }
    }

    eau_surface = eau_surface.max(0.0);
    apport[2] = eau_surface;

    InterceptionOutput { eau_surface, demande_eau, etr, apport_vertical: apport }
}

/// Banded mixed degree-day model. Each band is advanced with the
/// lumped-model physics using its own melt parameters, then
/// occupation-weighted into the scalar state fields. See DESIGN.md.
#[allow(clippy::too_many_arguments)]
fn banded(
    alt: bool,
    nb_pas: u32,
    pas: u32,
    jj: u32,
    radiation: Radiation,
    param: &Parameters,
    physio: &Physio,
    meteo: MeteoRow,
    reservoir_meteo: Option<MeteoRow>,
    etp_bassin: f64,
    etp_reservoir: f64,
    state: &mut State,
) -> InterceptionOutput {
    let duree = 1.0 / nb_pas as f64;
    let indice_radiation_detaille = match radiation {
        Radiation::Mdj => Some(calcul_indice_radiation(jj, physio.latitude, physio.i_orientation_bv, nb_pas, pas, physio.pente_bv)),
        Radiation::Hsami => None,
    };
    let occupation = if alt { &physio.occupation_bande } else { &physio.occupation };

    let banded_state = state.banded.as_mut().expect("banded snow state must be initialised for mdj/alt");
    let n = occupation.len();

    let median_alt = if alt && !physio.altitude_bande.is_empty() {
        let mut sorted = physio.altitude_bande.clone();
        sorted.sort_by(|a, b| a.total_cmp(b));
        sorted[sorted.len() / 2]
    } else {
        0.0
    };

    let mut apport = [0.0_f64; 5];
    let mut etr_total = 0.0;
    let mut etr_reservoir = 0.0;
    let mut eau_surface_total = 0.0;
    let mut sol_total = 0.0;
    let mut gel_total = 0.0;
    let mut demande_total = 0.0;

    if let Some(rm) = reservoir_meteo {
        apport[3] += rm.rain_cm + rm.snow_cm;
        etr_reservoir += (etp_reservoir * param.efficacite_evapo_ete().min(param.efficacite_evapo_hiver().max(param.efficacite_evapo_ete()))).min(etp_reservoir);
    }

    for i in 0..n {
        let frac = occupation[i];
        if frac <= 0.0 {
            continue;
        }

        let (tmin_i, tmax_i) = if alt {
            let offset_100m = (physio.altitude_bande[i] - median_alt) / 100.0;
            (meteo.tmin - 0.6 * offset_100m, meteo.tmax - 0.6 * offset_100m)
        } else {
            (meteo.tmin, meteo.tmax)
        };
        let t_moy = (tmin_i + tmax_i) / 2.0;

        let (taux_j, taux_n) = if alt {
            (param.taux_fonte_jour(), param.taux_fonte_nuit())
        } else {
            (param.taux_fonte_milieu(i.min(2)), param.taux_fonte_milieu(i.min(2)))
        };
        let temperature_fonte = if alt { param.temperature_fonte_jour() } else { param.temperature_fonte_milieu(i.min(2)) };

        let densite_fraiche = if t_moy < -17.0 {
            50.0
        } else if t_moy > 0.0 {
            150.0
        } else {
            50.0 + (150.0 - 50.0) * ((t_moy + 17.0) / 17.0).powi(2)
        };

        let depth_i = &mut banded_state.neige_au_sol[i];
        let density_i = &mut banded_state.densite_neige[i];
        let energie_i = &mut banded_state.energie_neige[i];

        let swe_fraiche = meteo.snow_cm / 100.0; // m water-equivalent
        if swe_fraiche > 0.0 {
            let depth_fraiche = swe_fraiche * DENSITE_EAU / densite_fraiche;
            *density_i = if *depth_i + depth_fraiche > 0.0 {
                (*density_i * *depth_i + densite_fraiche * depth_fraiche) / (*depth_i + depth_fraiche)
            } else {
                densite_fraiche
            };
            *depth_i += depth_fraiche;
        }

        let liquide_retenue = banded_state.fonte[i];
        if t_moy < 0.0 && liquide_retenue > 0.0 {
            *energie_i += liquide_retenue * DENSITE_EAU * L_FUSION;
            banded_state.fonte[i] = 0.0;
        }

        if meteo.rain_cm > 0.0 && *depth_i > 0.0 {
            *energie_i += meteo.rain_cm / 100.0 * DENSITE_EAU * (CHALEUR_SPEC_EAU * t_moy.max(0.0) + L_FUSION);
        }

        if *depth_i > 0.0 {
            let p = 1.0 / (10.0 * (*depth_i).max(1e-6));
            let t_neige = t_moy / (1.0 + p);
            let alpha = K_NEIGE / (density_i.max(1.0) * CHALEUR_SPEC_GLACE);
            let facteur_erf = erf((*depth_i / (2.0 * (alpha * duree).max(1e-12).sqrt())).abs()).unwrap_or(1.0);
            let conduction = K_NEIGE * (-t_neige) / (*depth_i).max(1e-6) * duree * 86400.0 * facteur_erf;
            *energie_i -= conduction.max(0.0);

            *energie_i += TAUX_FONTE_NS * duree * DENSITE_EAU * L_FUSION;

            let radiation_index = indice_radiation_detaille
                .unwrap_or_else(|| (1.15 - 0.4 * (-0.38 * state.derniere_neige).exp()) * (meteo.sunshine_fraction / 0.52).max(0.0).powf(0.33));
            if t_moy > temperature_fonte {
                let potentiel_fonte = taux_j.max(taux_n) * duree * (t_moy - temperature_fonte) * radiation_index * (1.0 - physio.albedo_sol);
                *energie_i += potentiel_fonte.max(0.0) * DENSITE_EAU * L_FUSION;
            }

            *depth_i *= 1.0 - CONSTANTE_TASSEMENT * duree * (1.0 - *density_i / DENSITE_NEIGE_MAX).max(0.0);
            *density_i = density_i.min(DENSITE_NEIGE_MAX);

            let mut melt = 0.0;
            if *energie_i > 0.0 {
                melt = *energie_i / (DENSITE_EAU * L_FUSION);
                *energie_i = 0.0;
                let capacite = param.capacite_retenue_neige() * *density_i * *depth_i;
                banded_state.fonte[i] = (banded_state.fonte[i] + melt).min(capacite);
                let excedent = (banded_state.fonte[i] + melt - capacite).max(0.0);
                eau_surface_total += excedent * 100.0 * frac;
                *depth_i = (*depth_i - melt).max(0.0);

                let demande_i = etp_bassin * param.efficacite_evapo_ete();
                let evapo = demande_i.min(banded_state.fonte[i]);
                banded_state.fonte[i] -= evapo;
                etr_total += evapo * 100.0 * frac;
                demande_total += (demande_i - evapo) * frac;
            } else {
                let demande_i = etp_bassin * param.efficacite_evapo_hiver();
                let sublimation = demande_i.min(*depth_i);
                *depth_i -= sublimation;
                etr_total += sublimation * 100.0 * frac;
                demande_total += (demande_i - sublimation) * frac;
            }
        } else if meteo.rain_cm > 0.0 {
            eau_surface_total += meteo.rain_cm * frac;
        }

        let (sol_i, gel_i) = if t_moy < 0.0 {
            gel_sol(state.sol.one_layer() / n as f64, state.gel / n as f64, t_moy, param)
        } else {
            degel_sol(state.sol.one_layer() / n as f64, state.gel / n as f64, t_moy, param)
        };
        sol_total += sol_i * frac * n as f64;
        gel_total += gel_i * frac * n as f64;

        banded_state.couvert_neige[i] = if *depth_i > 0.0 { 1.0 } else { 0.0 };
        banded_state.albedo_neige[i] = 0.5 + (banded_state.albedo_neige[i] - 0.5) * (-0.2 * (1.0 / nb_pas as f64) * (1.0 + banded_state.fonte[i])).exp();
    }

    state.sol = crate::state::SoilMoisture::OneLayer(sol_total);
    state.gel = gel_total;
    state.neige_au_sol = banded_state.neige_au_sol.iter().zip(occupation).map(|(d, f)| d * 100.0 * f).sum();

    if state.neige_au_sol <= 0.0 {
        let taux = param.taux_fonte_jour().max(param.taux_fonte_nuit()) * 1.5;
        let dt_max = meteo.tmax - param.temperature_fonte_jour();
        let fonte_glace = (dt_max.max(0.0) * taux * duree).min(state.eeg.iter().sum::<f64>());
        if fonte_glace > 0.0 {
            let mut remaining = fonte_glace;
            for v in state.eeg.iter_mut() {
                if remaining <= 0.0 {
                    break;
                }
                let take = remaining.min(*v);
                *v -= take;
                remaining -= take;
            }
            apport[4] += fonte_glace - remaining;
        }
    }

    apport[2] = eau_surface_total;
    let mut etr = [0.0_f64; 5];
    etr[0] = etr_total;
    etr[1] = etr_reservoir;

    InterceptionOutput { eau_surface: eau_surface_total.max(0.0), demande_eau: demande_total, etr, apport_vertical: apport }
}

/// Advance interception and the snowpack by one step.
#[allow(clippy::too_many_arguments)]
pub fn hsami_interception(
    nb_pas: u32,
    pas: u32,
    jj: u32,
    param: &Parameters,
    een: Een,
    radiation: Radiation,
    physio: &Physio,
    meteo: MeteoRow,
    reservoir_meteo: Option<MeteoRow>,
    etp_bassin: f64,
    etp_reservoir: f64,
    state: &mut State,
) -> InterceptionOutput {
    match een {
        Een::Hsami => lumped(false, nb_pas, param, meteo, reservoir_meteo, etp_bassin, etp_reservoir, state),
        Een::Dj => lumped(true, nb_pas, param, meteo, reservoir_meteo, etp_bassin, etp_reservoir, state),
        Een::Mdj => banded(false, nb_pas, pas, jj, radiation, param, physio, meteo, reservoir_meteo, etp_bassin, etp_reservoir, state),
        Een::Alt => banded(true, nb_pas, pas, jj, radiation, param, physio, meteo, reservoir_meteo, etp_bassin, etp_reservoir, state),
    }
}
