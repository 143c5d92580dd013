//! Output schema: one row per time step, plus mass-balance residuals.

use crate::state::State;

/// Discharges (m³/s) and ET components (cm/day) for one step.
#[derive(Debug, Clone, Copy, Default)]
pub struct StepOutputs {
    pub q_total: f64,
    pub q_base: f64,
    pub q_inter: f64,
    pub q_surf: f64,
    pub q_reservoir: f64,
    pub q_glace: f64,
    pub q_mh: f64,
    pub etp: f64,
    pub etr_total: f64,
    pub etr_sublim: f64,
    pub etr_psurn: f64,
    pub etr_intercept: f64,
    pub etr_transpir: f64,
    pub etr_reservoir: f64,
    pub etr_mhumide: f64,
}

/// Mass-balance residuals for one step, per submodule plus the whole basin.
#[derive(Debug, Clone, Copy, Default)]
pub struct StepDeltas {
    pub basin: f64,
    pub glace: f64,
    pub interception: f64,
    pub ruissellement: f64,
    pub vertical: f64,
    pub mhumide: f64,
    pub horizontal: f64,
}

/// A flattened snapshot of [`State`] suitable for a time series: `eeg` is
/// reported as its sum rather than all of its entries, flattening that one
/// array field down to a plain number.
#[derive(Debug, Clone, Copy)]
pub struct StateSnapshot {
    pub neige_au_sol: f64,
    pub fonte: f64,
    pub gel: f64,
    pub sol: [f64; 2],
    pub nappe: f64,
    pub reserve: f64,
    pub mh_surf: f64,
    pub mh_vol: f64,
    pub reservoir_epaisseur_glace: f64,
    pub reservoir_superficie_glace: f64,
    pub eeg_sum: f64,
    pub ratio_bassin: f64,
    pub ratio_reservoir: f64,
}

impl From<&State> for StateSnapshot {
    fn from(state: &State) -> Self {
        let sol = match state.sol {
            crate::state::SoilMoisture::OneLayer(v) => [v, 0.0],
            crate::state::SoilMoisture::ThreeLayer(v) => v,
        };
        StateSnapshot {
            neige_au_sol: state.neige_au_sol,
            fonte: state.fonte,
            gel: state.gel,
            sol,
            nappe: state.nappe,
            reserve: state.reserve,
            mh_surf: state.mh_surf,
            mh_vol: state.mh_vol,
            reservoir_epaisseur_glace: state.reservoir_epaisseur_glace,
            reservoir_superficie_glace: state.reservoir_superficie_glace,
            eeg_sum: state.eeg.iter().sum(),
            ratio_bassin: state.ratio_bassin,
            ratio_reservoir: state.ratio_reservoir,
        }
    }
}

/// The three parallel time series produced by a full run.
#[derive(Debug, Clone, Default)]
pub struct ModelOutputs {
    pub s: Vec<StepOutputs>,
    pub etats: Vec<StateSnapshot>,
    pub deltas: Vec<StepDeltas>,
}
