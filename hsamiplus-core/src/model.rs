//! Multi-step orchestrator: owns a [`Project`] and its [`State`],
//! runs the 365-step warm-up, then the main loop over the full meteorology
//! series, collecting one [`ModelOutputs`] time series.

use log::{debug, info};

use crate::driver::{self, DriverConfig};
use crate::inputs::Project;
use crate::outputs::{ModelOutputs, StateSnapshot};
use crate::state::State;

/// The running model: a validated [`Project`] plus its evolving [`State`].
/// Construct with [`Model::new`], advance the whole series with [`Model::run`].
#[derive(Debug)]
pub struct Model {
    project: Project,
    state: State,
    config: DriverConfig,
}

impl Model {
    /// Resolve the unit hydrographs and zero-initialise the state. Does not
    /// run the warm-up; call [`Model::run`] for that.
    pub fn new(project: Project) -> Self {
        let config = DriverConfig::resolve(&project);
        let state = State::init(&project);
        Model { project, state, config }
    }

    /// Run the 365-step warm-up followed by the full meteorology series. The
    /// warm-up discards its outputs and deltas, keeping only the resulting
    /// `State`; the main loop then reprocesses the series from its first
    /// row, this time collecting every step's outputs.
    pub fn run(&mut self) -> ModelOutputs {
        let nb_pas_total = self.project.meteo.bassin.len();
        let nb_pas_par_jour = self.project.nb_pas_par_jour;

        let warmup_len = nb_pas_total.min(365);
        info!("Starting model warm-up over {warmup_len} step(s)");
        let mut pas = 1u32;
        for i in 0..warmup_len {
            let date = &self.project.dates[i];
            let meteo = self.project.meteo.bassin[i];
            let reservoir_meteo = self.project.meteo.reservoir[i];
            driver::step(&self.project, &self.config, date, pas, i, meteo, reservoir_meteo, &mut self.state);
            pas = if pas >= nb_pas_par_jour { 1 } else { pas + 1 };
        }
        debug!("Warm-up complete, starting main run over {nb_pas_total} step(s)");

        let mut outputs = ModelOutputs {
            s: Vec::with_capacity(nb_pas_total),
            etats: Vec::with_capacity(nb_pas_total),
            deltas: Vec::with_capacity(nb_pas_total),
        };

        let mut pas = 1u32;
        for i in 0..nb_pas_total {
            let date = &self.project.dates[i];
            let meteo = self.project.meteo.bassin[i];
            let reservoir_meteo = self.project.meteo.reservoir[i];
            let (step_outputs, step_deltas) = driver::step(&self.project, &self.config, date, pas, i, meteo, reservoir_meteo, &mut self.state);

            outputs.s.push(step_outputs);
            outputs.deltas.push(step_deltas);
            outputs.etats.push(StateSnapshot::from(&self.state));

            pas = if pas >= nb_pas_par_jour { 1 } else { pas + 1 };
        }
        info!("Model run complete");

        outputs
    }

    /// The project this model was built from.
    pub fn project(&self) -> &Project {
        &self.project
    }

    /// The current internal state (after the most recent [`Model::run`]).
    pub fn state(&self) -> &State {
        &self.state
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inputs::{DateStamp, Meteo, MeteoRow, ModuleSelections, Physio};

    fn param() -> [f64; 50] {
        let mut values = [0.5_f64; 50];
        values[23] = 80.0; // SCS curve number
        values[25] = -50.0; // wetting-front matric potential is non-positive
        values
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
            coeff: [0.3, 0.3, 0.4],
            samax: 0.0,
            niveau: None,
        }
    }

    fn meteo_series(n: usize) -> Meteo {
        let mut bassin = Vec::with_capacity(n);
        let mut reservoir = Vec::with_capacity(n);
        for i in 0..n {
            let t = (i as f64 / 30.0).sin() * 10.0;
            bassin.push(MeteoRow::new(t - 2.0, t + 2.0, 0.1, 0.0, Some(0.5), None));
            reservoir.push(MeteoRow::new(t - 2.0, t + 2.0, 0.1, 0.0, Some(0.5), None));
        }
        Meteo { bassin, reservoir }
    }

    fn dates(n: usize) -> Vec<DateStamp> {
        (0..n)
            .map(|i| {
                let day = 1 + (i % 28) as u32;
                let month = 1 + ((i / 28) % 12) as u32;
                DateStamp { year: 2000, month, day, minute: 0, second: 0 }
            })
            .collect()
    }

    fn project(n: usize) -> Project {
        Project::new(
            &[100.0],
            &param(),
            10,
            ModuleSelections::default(),
            physio(),
            meteo_series(n),
            dates(n),
            1,
            None,
            None,
        )
        .unwrap()
    }

    #[test]
    fn run_produces_one_output_row_per_meteo_row() {
        let n = 40;
        let mut model = Model::new(project(n));
        let outputs = model.run();
        assert_eq!(outputs.s.len(), n);
        assert_eq!(outputs.etats.len(), n);
        assert_eq!(outputs.deltas.len(), n);
    }

    #[test]
    fn ratios_partition_the_basin_without_a_reservoir() {
        let mut model = Model::new(project(5));
        let outputs = model.run();
        for etat in &outputs.etats {
            assert!((etat.ratio_bassin + etat.ratio_reservoir - 1.0).abs() < 1e-9);
        }
    }

    #[test]
    fn q_mh_is_zero_when_wetland_disabled() {
        let mut model = Model::new(project(10));
        let outputs = model.run();
        for s in &outputs.s {
            assert_eq!(s.q_mh, 0.0);
        }
    }

    #[test]
    fn outputs_are_finite() {
        let mut model = Model::new(project(20));
        let outputs = model.run();
        for s in &outputs.s {
            assert!(s.q_total.is_finite());
            assert!(s.etr_total.is_finite());
        }
    }
}
