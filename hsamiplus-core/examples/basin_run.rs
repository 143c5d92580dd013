//! Runs the kernel over a small bundled meteorology fixture and logs a
//! summary.

use chrono::{Datelike, NaiveDate};
use hsamiplus::inputs::{DateStamp, Meteo, MeteoRow, ModuleSelections, Physio, Project};
use hsamiplus::model::Model;
use log::{info, LevelFilter};
use std::error::Error;

fn load_demo_meteo() -> Result<(Meteo, Vec<DateStamp>), Box<dyn Error>> {
    let csv = include_str!("../src/test_data/meteo_basin_demo.csv");
    let mut rdr = csv::Reader::from_reader(csv.as_bytes());

    let mut bassin = Vec::new();
    let mut dates = Vec::new();
    for result in rdr.records() {
        let record = result?;
        let date = NaiveDate::parse_from_str(record.get(0).unwrap(), "%Y-%m-%d")?;
        let tmin: f64 = record.get(1).unwrap().parse()?;
        let tmax: f64 = record.get(2).unwrap().parse()?;
        let precip: f64 = record.get(3).unwrap().parse()?;
        let sunshine: f64 = record.get(4).unwrap().parse()?;

        let (rain_cm, snow_cm) = if (tmin + tmax) / 2.0 > 0.0 { (precip, 0.0) } else { (0.0, precip) };

        dates.push(DateStamp {
            year: date.year(),
            month: date.month(),
            day: date.day(),
            minute: 0,
            second: 0,
        });
        bassin.push(MeteoRow::new(tmin, tmax, rain_cm, snow_cm, Some(sunshine), None));
    }
    let reservoir = bassin.clone();
    Ok((Meteo { bassin, reservoir }, dates))
}

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::builder().filter_level(LevelFilter::Info).init();

    let (meteo, dates) = load_demo_meteo()?;

    let physio = Physio {
        latitude: 46.8_f64.to_radians(),
        altitude: 350.0,
        albedo_sol: 0.2,
        i_orientation_bv: 1,
        pente_bv: 0.02,
        occupation: vec![1.0],
        occupation_bande: vec![1.0],
        altitude_bande: vec![350.0],
        coeff: [0.3, 0.3, 0.4],
        samax: 0.0,
        niveau: None,
    };

    let mut param = [0.5_f64; 50];
    param[23] = 80.0; // SCS curve number, used only if "infiltration" selects scs_cn
    param[25] = -50.0; // wetting-front matric potential is non-positive

    let project = Project::new(
        &[25.0],
        &param,
        10,
        ModuleSelections::default(),
        physio,
        meteo,
        dates,
        1,
        None,
        None,
    )?;

    let mut model = Model::new(project);
    let outputs = model.run();

    let total_runoff: f64 = outputs.s.iter().map(|s| s.q_total).sum();
    let max_basin_residual = outputs.deltas.iter().map(|d| d.basin.abs()).fold(0.0_f64, f64::max);
    info!("ran {} step(s), total discharge {:.3} m3/s-days, max basin residual {:.2e} cm", outputs.s.len(), total_runoff, max_basin_residual);

    Ok(())
}
