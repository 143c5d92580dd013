use crate::error::ConfigurationError;

/// Describes one position of the fixed 50-element parameter vector: its name,
/// unit of measurement and the bounds a value at that position must respect.
/// Unlike the single-model parameter set this generalises from (one Rust type
/// per parameter), fifty distinct newtypes would obscure rather than clarify
/// a vector whose defining property is that *positions* are fixed;
/// a single indexed wrapper with named, bounds-checked accessors keeps that
/// contract explicit while staying readable. See DESIGN.md.
pub struct ParameterSpec {
    pub name: &'static str,
    pub unit: &'static str,
    pub min: f64,
    pub max: f64,
}

macro_rules! param {
    ($name:expr, $unit:expr, $min:expr, $max:expr) => {
        ParameterSpec { name: $name, unit: $unit, min: $min, max: $max }
    };
}

/// One entry per position 0..49, in order. Bounds are permissive where the
/// source imposes none beyond physical sign; fractions are bounded to [0, 1].
pub const PARAMETER_SPECS: [ParameterSpec; 50] = [
    param!("summer evapotranspiration efficacy", "-", 0.0, 2.0),
    param!("winter evapotranspiration efficacy", "-", 0.0, 2.0),
    param!("daytime melt rate", "cm/degC/day", 0.0, 5.0),
    param!("nighttime melt rate", "cm/degC/day", 0.0, 5.0),
    param!("daytime melt temperature", "degC", -10.0, 10.0),
    param!("nighttime melt temperature", "degC", -10.0, 10.0),
    param!("reference rain temperature", "degC", -10.0, 10.0),
    param!("thaw effect on snow-covered area", "-", 0.0, 10.0),
    param!("freeze effect", "-", 0.0, 10.0),
    param!("soil effect", "-", 0.0, 100.0),
    param!("minimum runoff threshold", "cm", 0.0, 50.0),
    param!("minimum soil moisture (one-layer)", "cm", 0.0, 200.0),
    param!("maximum soil moisture (one-layer)", "cm", 0.0, 500.0),
    param!("maximum groundwater storage", "cm", 0.0, 200.0),
    param!("surface-runoff partition fraction", "-", 0.0, 1.0),
    param!("max-soil-overflow partition fraction", "-", 0.0, 1.0),
    param!("soil drainage rate", "1/day", 0.0, 1.0),
    param!("groundwater drainage rate", "1/day", 0.0, 1.0),
    param!("intermediate reserve drainage rate", "1/day", 0.0, 1.0),
    param!("surface unit hydrograph mode", "-", 0.0, 50.0),
    param!("surface unit hydrograph shape", "-", 0.0, 50.0),
    param!("intermediate unit hydrograph mode", "-", 0.0, 50.0),
    param!("intermediate unit hydrograph shape", "-", 0.0, 50.0),
    param!("SCS curve number", "-", 1.0, 100.0),
    param!("log10 saturated hydraulic conductivity, layer 1", "log10(cm/day)", -5.0, 5.0),
    param!("wetting-front matric potential", "cm", -500.0, 0.0),
    param!("Dingman groundwater recession coefficient", "1/day", 0.0, 10.0),
    param!("Dingman specific yield", "-", 0.0, 1.0),
    param!("melt rate, land cover 1 (coniferous)", "cm/degC/day", 0.0, 5.0),
    param!("melt rate, land cover 2 (deciduous)", "cm/degC/day", 0.0, 5.0),
    param!("melt rate, land cover 3 (other)", "cm/degC/day", 0.0, 5.0),
    param!("melt temperature, land cover 1 (coniferous)", "degC", -10.0, 10.0),
    param!("melt temperature, land cover 2 (deciduous)", "degC", -10.0, 10.0),
    param!("melt temperature, land cover 3 (other)", "degC", -10.0, 10.0),
    param!("log10 Ks power for infiltration", "-", -5.0, 5.0),
    param!("snow liquid-water retention capacity", "-", 0.0, 1.0),
    param!("pore-size distribution index (b), layer 1", "-", 0.0, 20.0),
    param!("pore-size distribution index (b), layer 2", "-", 0.0, 20.0),
    param!("log10 saturated hydraulic conductivity, layer 2", "log10(cm/day)", -5.0, 5.0),
    param!("layer 1 thickness", "cm", 0.0, 500.0),
    param!("layer 2 thickness", "cm", 0.0, 500.0),
    param!("permanent wilting point, layer 1", "-", 0.0, 1.0),
    param!("field capacity, layer 1", "-", 0.0, 1.0),
    param!("field capacity, layer 2", "-", 0.0, 1.0),
    param!("porosity, layer 1", "-", 0.0, 1.0),
    param!("porosity, layer 2", "-", 0.0, 1.0),
    param!("Stefan ice-growth coefficient (k)", "-", 0.0, 5.0),
    param!("wetland maximum depth coefficient (hmax)", "m", 0.0, 20.0),
    param!("wetland normal-area coefficient (p_norm)", "-", 0.0, 1.0),
    param!("log10 wetland base saturated hydraulic conductivity", "log10(mm/day)", -5.0, 5.0),
];

/// The fixed 50-element parameter vector. Positions match the source's
/// layout exactly; this wrapper only adds named, documented, bounds-checked
/// access.
#[derive(Debug, Clone, Copy)]
pub struct Parameters([f64; 50]);

impl Parameters {
    /// Build from a slice, checking length and per-position bounds.
    pub fn new(values: &[f64]) -> Result<Self, ConfigurationError> {
        if values.len() != 50 {
            return Err(ConfigurationError::WrongParameterLength(values.len()));
        }
        let mut arr = [0.0; 50];
        arr.copy_from_slice(values);
        for (i, &v) in arr.iter().enumerate() {
            let s = &PARAMETER_SPECS[i];
            if v < s.min || v > s.max {
                return Err(ConfigurationError::Generic(format!(
                    "param[{i}] ({}) = {v} is outside its bounds [{}, {}] {}",
                    s.name, s.min, s.max, s.unit
                )));
            }
        }
        Ok(Self(arr))
    }

    /// Access a raw position. Kept for submodules that index the vector
    /// directly the way the reference implementation's formulas do.
    pub fn at(&self, index: usize) -> f64 {
        self.0[index]
    }

    pub fn efficacite_evapo_ete(&self) -> f64 {
        self.0[0]
    }
    pub fn efficacite_evapo_hiver(&self) -> f64 {
        self.0[1]
    }
    pub fn taux_fonte_jour(&self) -> f64 {
        self.0[2]
    }
    pub fn taux_fonte_nuit(&self) -> f64 {
        self.0[3]
    }
    pub fn temperature_fonte_jour(&self) -> f64 {
        self.0[4]
    }
    pub fn temperature_fonte_nuit(&self) -> f64 {
        self.0[5]
    }
    pub fn temperature_reference_pluie(&self) -> f64 {
        self.0[6]
    }
    pub fn effet_redoux_sur_aire_enneigee(&self) -> f64 {
        self.0[7]
    }
    pub fn effet_gel(&self) -> f64 {
        self.0[8]
    }
    pub fn effet_sol(&self) -> f64 {
        self.0[9]
    }
    pub fn seuil_min(&self) -> f64 {
        self.0[10]
    }
    pub fn sol_min(&self) -> f64 {
        self.0[11]
    }
    pub fn sol_max(&self) -> f64 {
        self.0[12]
    }
    pub fn nappe_max(&self) -> f64 {
        self.0[13]
    }
    pub fn portion_ruissellement_surface(&self) -> f64 {
        self.0[14]
    }
    pub fn portion_ruissellement_sol_max(&self) -> f64 {
        self.0[15]
    }
    pub fn taux_vidange_sol_min(&self) -> f64 {
        self.0[16]
    }
    pub fn taux_vidange_nappe(&self) -> f64 {
        self.0[17]
    }
    pub fn taux_vidange_inter(&self) -> f64 {
        self.0[18]
    }
    pub fn mode_hu_surface(&self) -> f64 {
        self.0[19]
    }
    pub fn forme_hu_surface(&self) -> f64 {
        self.0[20]
    }
    pub fn mode_hu_inter(&self) -> f64 {
        self.0[21]
    }
    pub fn forme_hu_inter(&self) -> f64 {
        self.0[22]
    }
    pub fn curve_number(&self) -> f64 {
        self.0[23]
    }
    pub fn log_ks_couche1(&self) -> f64 {
        self.0[24]
    }
    pub fn psi(&self) -> f64 {
        self.0[25]
    }
    pub fn dingman_k(&self) -> f64 {
        self.0[26]
    }
    pub fn dingman_sy(&self) -> f64 {
        self.0[27]
    }
    pub fn taux_fonte_milieu(&self, i: usize) -> f64 {
        self.0[28 + i]
    }
    pub fn temperature_fonte_milieu(&self, i: usize) -> f64 {
        self.0[31 + i]
    }
    pub fn log_ks_infiltration_power(&self) -> f64 {
        self.0[34]
    }
    pub fn capacite_retenue_neige(&self) -> f64 {
        self.0[35]
    }
    pub fn b_couche(&self, i: usize) -> f64 {
        self.0[36 + i]
    }
    pub fn log_ks_couche2(&self) -> f64 {
        self.0[38]
    }
    pub fn epaisseur_couche(&self, i: usize) -> f64 {
        self.0[39 + i]
    }
    pub fn pfp_couche1(&self) -> f64 {
        self.0[41]
    }
    pub fn cc_couche(&self, i: usize) -> f64 {
        self.0[42 + i]
    }
    pub fn porosite_couche(&self, i: usize) -> f64 {
        self.0[44 + i]
    }
    pub fn stefan_k(&self) -> f64 {
        self.0[46]
    }
    pub fn mh_hmax(&self) -> f64 {
        self.0[47]
    }
    pub fn mh_p_norm(&self) -> f64 {
        self.0[48]
    }
    pub fn mh_log_ksat(&self) -> f64 {
        self.0[49]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_vector_is_accepted() {
        let mut values = [0.5_f64; 50];
        values[23] = 80.0; // curve number within [1, 100]
        values[25] = -50.0; // wetting-front matric potential is non-positive
        let p = Parameters::new(&values).unwrap();
        assert_eq!(p.sol_min(), 0.5);
        assert_eq!(p.curve_number(), 80.0);
    }

    #[test]
    fn wrong_length_is_rejected() {
        let values = [0.0_f64; 10];
        assert!(matches!(
            Parameters::new(&values),
            Err(ConfigurationError::WrongParameterLength(10))
        ));
    }

    #[test]
    fn out_of_bounds_is_rejected() {
        let mut values = [0.5_f64; 50];
        values[23] = 500.0; // curve number out of [1, 100]
        assert!(Parameters::new(&values).is_err());
    }
}
