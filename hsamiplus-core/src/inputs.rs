use crate::error::ConfigurationError;
use crate::parameter::Parameters;

/// One evapotranspiration formulation (`etp_bassin` / `etp_reservoir`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EtpFormula {
    Hsami,
    BlaneyCriddle,
    Hamon,
    Linacre,
    Kharrufa,
    Mohyse,
    Romanenko,
    Makkink,
    Turc,
    McGuinnessBordne,
    Abtew,
    Hargreaves,
    PriestleyTaylor,
}

impl EtpFormula {
    fn parse(tag: &str) -> Option<Self> {
        use EtpFormula::*;
        Some(match tag {
            "hsami" => Hsami,
            "blaney_criddle" => BlaneyCriddle,
            "hamon" => Hamon,
            "linacre" => Linacre,
            "kharrufa" => Kharrufa,
            "mohyse" => Mohyse,
            "romanenko" => Romanenko,
            "makkink" => Makkink,
            "turc" => Turc,
            "mcguinness_bordne" => McGuinnessBordne,
            "abtew" => Abtew,
            "hargreaves" => Hargreaves,
            "priestley_taylor" => PriestleyTaylor,
            _ => return None,
        })
    }

    const ALLOWED: &'static str = "hsami, blaney_criddle, hamon, linacre, kharrufa, mohyse, romanenko, makkink, turc, mcguinness_bordne, abtew, hargreaves, priestley_taylor";
}

/// Snow/ice interception scheme (`een`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Een {
    Hsami,
    Dj,
    Mdj,
    Alt,
}

impl Een {
    fn parse(tag: &str) -> Option<Self> {
        use Een::*;
        Some(match tag {
            "hsami" => Hsami,
            "dj" => Dj,
            "mdj" => Mdj,
            "alt" => Alt,
            _ => return None,
        })
    }
    const ALLOWED: &'static str = "hsami, dj, mdj, alt";
}

/// Surface infiltration formulation (`infiltration`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Infiltration {
    Hsami,
    GreenAmpt,
    ScsCn,
}

impl Infiltration {
    fn parse(tag: &str) -> Option<Self> {
        use Infiltration::*;
        Some(match tag {
            "hsami" => Hsami,
            "green_ampt" => GreenAmpt,
            "scs_cn" => ScsCn,
            _ => return None,
        })
    }
    const ALLOWED: &'static str = "hsami, green_ampt, scs_cn";
}

/// Soil-column configuration (`sol`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sol {
    Hsami,
    TroisCouches,
}

impl Sol {
    fn parse(tag: &str) -> Option<Self> {
        use Sol::*;
        Some(match tag {
            "hsami" => Hsami,
            "3couches" => TroisCouches,
            _ => return None,
        })
    }
    const ALLOWED: &'static str = "hsami, 3couches";
}

/// Groundwater drainage law (`qbase`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QBase {
    Hsami,
    Dingman,
}

impl QBase {
    fn parse(tag: &str) -> Option<Self> {
        use QBase::*;
        Some(match tag {
            "hsami" => Hsami,
            "dingman" => Dingman,
            _ => return None,
        })
    }
    const ALLOWED: &'static str = "hsami, dingman";
}

/// Radiation-index detail level (`radiation`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Radiation {
    Hsami,
    Mdj,
}

impl Radiation {
    fn parse(tag: &str) -> Option<Self> {
        use Radiation::*;
        Some(match tag.trim() {
            "hsami" => Hsami,
            "mdj" => Mdj,
            _ => return None,
        })
    }
    const ALLOWED: &'static str = "hsami, mdj";
}

/// Reservoir-ice formulation (`glace_reservoir`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GlaceReservoir {
    None,
    Stefan,
    MyLake,
}

impl GlaceReservoir {
    fn parse(tag: &str) -> Option<Self> {
        use GlaceReservoir::*;
        Some(match tag {
            "0" => None,
            "stefan" => Stefan,
            "mylake" => MyLake,
            _ => return None,
        })
    }
    const ALLOWED: &'static str = "0, stefan, mylake";
}

/// Raw module selections as they arrive at the core's configuration boundary:
/// string/boolean tags, optional (defaults apply when absent). This
/// is the shape an external I/O layer is expected to hand in; `Modules`
/// below is the validated, typed form the rest of the crate consumes.
#[derive(Debug, Clone, Default)]
pub struct ModuleSelections {
    pub etp_bassin: Option<String>,
    pub etp_reservoir: Option<String>,
    pub een: Option<String>,
    pub infiltration: Option<String>,
    pub sol: Option<String>,
    pub qbase: Option<String>,
    pub radiation: Option<String>,
    pub reservoir: Option<bool>,
    pub mhumide: Option<bool>,
    pub glace_reservoir: Option<String>,
}

/// Validated, typed module selections.
#[derive(Debug, Clone, Copy)]
pub struct Modules {
    pub etp_bassin: EtpFormula,
    pub etp_reservoir: EtpFormula,
    pub een: Een,
    pub infiltration: Infiltration,
    pub sol: Sol,
    pub qbase: QBase,
    pub radiation: Radiation,
    pub reservoir: bool,
    pub mhumide: bool,
    pub glace_reservoir: GlaceReservoir,
}

macro_rules! resolve {
    ($sel:expr, $key:literal, $ty:ty, $default:expr) => {
        match &$sel {
            Some(raw) => <$ty>::parse(raw).ok_or_else(|| {
                ConfigurationError::InvalidModuleValue($key.to_string(), raw.clone(), <$ty>::ALLOWED.to_string())
            })?,
            None => $default,
        }
    };
}

impl Modules {
    /// Fill in defaults for any unset module selection and validate every
    /// tag against its allowed set.
    pub fn resolve(selections: &ModuleSelections) -> Result<Self, ConfigurationError> {
        let etp_bassin = resolve!(selections.etp_bassin, "etp_bassin", EtpFormula, EtpFormula::Hsami);
        let etp_reservoir = resolve!(selections.etp_reservoir, "etp_reservoir", EtpFormula, EtpFormula::Hsami);
        let een = resolve!(selections.een, "een", Een, Een::Hsami);
        let infiltration = resolve!(selections.infiltration, "infiltration", Infiltration, Infiltration::Hsami);
        let sol = resolve!(selections.sol, "sol", Sol, Sol::Hsami);
        let qbase = resolve!(selections.qbase, "qbase", QBase, QBase::Hsami);
        let radiation = resolve!(selections.radiation, "radiation", Radiation, Radiation::Hsami);
        let glace_reservoir = resolve!(selections.glace_reservoir, "glace_reservoir", GlaceReservoir, GlaceReservoir::None);
        let reservoir = selections.reservoir.unwrap_or(false);
        let mhumide = selections.mhumide.unwrap_or(false);

        if glace_reservoir == GlaceReservoir::MyLake && !matches!(een, Een::Mdj | Een::Alt) {
            let got = match een {
                Een::Hsami => "hsami",
                Een::Dj => "dj",
                Een::Mdj => "mdj",
                Een::Alt => "alt",
            };
            return Err(ConfigurationError::MylakeRequiresBandedSnow(got.to_string()));
        }

        Ok(Modules {
            etp_bassin,
            etp_reservoir,
            een,
            infiltration,
            sol,
            qbase,
            radiation,
            reservoir,
            mhumide,
            glace_reservoir,
        })
    }
}

/// Physiography (`physio`). Latitude is normalised to radians at
/// `Project::new` time if it arrives in degrees (detected by magnitude),
/// matching the driver's own idempotent conversion.
#[derive(Debug, Clone)]
pub struct Physio {
    pub latitude: f64,
    pub altitude: f64,
    pub albedo_sol: f64,
    pub i_orientation_bv: u8,
    pub pente_bv: f64,
    pub occupation: Vec<f64>,
    pub occupation_bande: Vec<f64>,
    pub altitude_bande: Vec<f64>,
    pub coeff: [f64; 3],
    pub samax: f64,
    pub niveau: Option<Vec<f64>>,
}

/// One row of daily meteorology (`meteo`). Missing optional fields
/// defaulting sunshine to 0.5 and observed SWE
/// to a `None` sentinel when the source encodes it as -1.
#[derive(Debug, Clone, Copy)]
pub struct MeteoRow {
    pub tmin: f64,
    pub tmax: f64,
    pub rain_cm: f64,
    pub snow_cm: f64,
    pub sunshine_fraction: f64,
    pub swe_observed: Option<f64>,
}

impl MeteoRow {
    pub fn new(tmin: f64, tmax: f64, rain_cm: f64, snow_cm: f64, sunshine_fraction: Option<f64>, swe_observed: Option<f64>) -> Self {
        let (tmin, tmax) = if tmin > tmax { (tmax, tmin) } else { (tmin, tmax) };
        Self {
            tmin,
            tmax,
            rain_cm,
            snow_cm,
            sunshine_fraction: sunshine_fraction.unwrap_or(0.5),
            swe_observed,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Meteo {
    pub bassin: Vec<MeteoRow>,
    pub reservoir: Vec<MeteoRow>,
}

/// A timestamp aligned with one meteorology row (`dates`).
#[derive(Debug, Clone, Copy)]
pub struct DateStamp {
    pub year: i32,
    pub month: u32,
    pub day: u32,
    pub minute: u32,
    pub second: u32,
}

/// The immutable, validated project. Constructed once via
/// [`Project::new`], never mutated; the single configuration-loading
/// boundary an external I/O layer is expected to call.
#[derive(Debug, Clone)]
pub struct Project {
    pub superficie: [f64; 2],
    pub memoire: usize,
    pub param: Parameters,
    pub modules: Modules,
    pub physio: Physio,
    pub meteo: Meteo,
    pub dates: Vec<DateStamp>,
    pub nb_pas_par_jour: u32,
    pub hu_surface: Option<Vec<f64>>,
    pub hu_inter: Option<Vec<f64>>,
}

impl Project {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        superficie: &[f64],
        param: &[f64],
        memoire: usize,
        selections: ModuleSelections,
        mut physio: Physio,
        meteo: Meteo,
        dates: Vec<DateStamp>,
        nb_pas_par_jour: u32,
        hu_surface: Option<Vec<f64>>,
        hu_inter: Option<Vec<f64>>,
    ) -> Result<Self, ConfigurationError> {
        let superficie: [f64; 2] = match superficie.len() {
            1 => [superficie[0], 0.0],
            2 => [superficie[0], superficie[1]],
            n => return Err(ConfigurationError::Generic(format!("superficie must have length 1 or 2, got {n}"))),
        };

        if nb_pas_par_jour < 1 {
            return Err(ConfigurationError::InvalidStepsPerDay(nb_pas_par_jour as i64));
        }

        if meteo.bassin.len() != meteo.reservoir.len() {
            return Err(ConfigurationError::MismatchedLength(
                "meteo".to_string(),
                "reservoir".to_string(),
                meteo.bassin.len(),
                meteo.reservoir.len(),
            ));
        }
        if meteo.bassin.len() != dates.len() {
            return Err(ConfigurationError::MismatchedLength(
                "dates".to_string(),
                "meteo".to_string(),
                dates.len(),
                meteo.bassin.len(),
            ));
        }

        if physio.latitude.abs() > std::f64::consts::PI {
            physio.latitude = physio.latitude.to_radians();
        }

        let param = Parameters::new(param)?;
        let modules = Modules::resolve(&selections)?;

        if modules.mhumide && physio.samax == 0.0 {
            return Err(ConfigurationError::WetlandWithoutMaxArea);
        }

        if let Some(h) = &hu_surface {
            if h.len() != memoire {
                return Err(ConfigurationError::ImposedHydrographLength("hu_surface".to_string(), memoire, h.len()));
            }
        }
        if let Some(h) = &hu_inter {
            if h.len() != memoire {
                return Err(ConfigurationError::ImposedHydrographLength("hu_inter".to_string(), memoire, h.len()));
            }
        }

        if matches!(modules.een, Een::Mdj | Een::Alt) {
            let bands = if modules.een == Een::Mdj { &physio.occupation } else { &physio.occupation_bande };
            let sum: f64 = bands.iter().sum();
            if !bands.is_empty() && (sum - 1.0).abs() > 1e-6 {
                log::warn!("{}", crate::error::Warning::OccupationFractionsNotOne { sum });
            }
        }

        Ok(Project {
            superficie,
            memoire,
            param,
            modules,
            physio,
            meteo,
            dates,
            nb_pas_par_jour,
            hu_surface,
            hu_inter,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row() -> MeteoRow {
        MeteoRow::new(3.3, 15.5, 12.3, 0.0, Some(0.5), None)
    }

    fn physio() -> Physio {
        Physio {
            latitude: 47.1943,
            altitude: 390.9,
            albedo_sol: 0.7,
            i_orientation_bv: 1,
            pente_bv: 3.0,
            occupation: vec![],
            occupation_bande: vec![],
            altitude_bande: vec![],
            coeff: [0.0, 0.0, 0.0],
            samax: 0.0,
            niveau: None,
        }
    }

    #[test]
    fn swapped_tmin_tmax_is_silently_fixed() {
        let r = MeteoRow::new(15.0, 3.0, 0.0, 0.0, None, None);
        assert_eq!(r.tmin, 3.0);
        assert_eq!(r.tmax, 15.0);
        assert_eq!(r.sunshine_fraction, 0.5);
    }

    fn valid_param() -> [f64; 50] {
        let mut values = [0.5_f64; 50];
        values[23] = 80.0; // curve number
        values[25] = -50.0; // wetting-front matric potential is non-positive
        values
    }

    #[test]
    fn wetland_without_max_area_is_rejected() {
        let meteo = Meteo { bassin: vec![row()], reservoir: vec![row()] };
        let dates = vec![DateStamp { year: 2020, month: 1, day: 1, minute: 0, second: 0 }];
        let selections = ModuleSelections { mhumide: Some(true), ..Default::default() };
        let err = Project::new(&[10.0], &valid_param(), 10, selections, physio(), meteo, dates, 1, None, None).unwrap_err();
        assert_eq!(err, ConfigurationError::WetlandWithoutMaxArea);
    }

    #[test]
    fn mylake_requires_banded_snow() {
        let meteo = Meteo { bassin: vec![row()], reservoir: vec![row()] };
        let dates = vec![DateStamp { year: 2020, month: 1, day: 1, minute: 0, second: 0 }];
        let selections = ModuleSelections { glace_reservoir: Some("mylake".to_string()), ..Default::default() };
        let err = Project::new(&[10.0], &valid_param(), 10, selections, physio(), meteo, dates, 1, None, None).unwrap_err();
        assert!(matches!(err, ConfigurationError::MylakeRequiresBandedSnow(_)));
    }
}
