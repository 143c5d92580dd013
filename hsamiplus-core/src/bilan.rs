//! Mass-balance accountant: per-submodule and whole-basin
//! residual closure, rounded to 10 decimal places.

use crate::error::Warning;
use crate::utils::round10;

/// One submodule's snapshot, taken immediately before and after it runs.
#[derive(Debug, Clone, Copy, Default)]
pub struct SubmoduleSnapshot {
    pub entrees: f64,
    pub sorties: f64,
    pub etat_initial: f64,
    pub etat_final: f64,
}

/// `entrees − sorties + etat_init − etat_final`, rounded to 10 decimals.
/// Logs a [`Warning`] if the residual exceeds the 1e-9 cm tolerance without
/// aborting the run.
pub fn submodule_residual(name: &'static str, snap: SubmoduleSnapshot) -> f64 {
    let residual = round10(snap.entrees - snap.sorties + snap.etat_initial - snap.etat_final);
    if residual.abs() > 1e-9 {
        log::warn!("{}", Warning::MassBalanceResidualExceeded { submodule: name, residual });
    }
    residual
}

/// Whole-basin closure across every submodule.
#[allow(clippy::too_many_arguments)]
pub fn whole_basin_residual(
    ratio_bassin: f64,
    ratio_reservoir: f64,
    precip_bassin: f64,
    precip_reservoir: f64,
    reserv_ini: f64,
    etats_ini: f64,
    eaux_hu_ini: f64,
    etats_end: f64,
    eaux_hu_end: f64,
    debit: f64,
    etr_total: f64,
) -> f64 {
    let entrees = ratio_bassin * precip_bassin + ratio_reservoir * precip_reservoir;
    round10(entrees + reserv_ini + etats_ini + eaux_hu_ini - etats_end - eaux_hu_end - debit - etr_total)
}

/// Convert a depth flux (cm/day) over an area (km²) into a discharge (m³/s):
/// `cm/day → m³/s = depth · area_km² / 8.64`.
pub fn depth_to_discharge(depth_cm: f64, area_km2: f64) -> f64 {
    depth_cm * area_km2 / 8.64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn balanced_submodule_has_zero_residual() {
        let snap = SubmoduleSnapshot { entrees: 3.0, sorties: 1.0, etat_initial: 2.0, etat_final: 4.0 };
        assert_eq!(submodule_residual("vertical", snap), 0.0);
    }

    #[test]
    fn depth_to_discharge_matches_the_conversion_factor() {
        let q = depth_to_discharge(8.64, 10.0);
        assert!((q - 10.0).abs() < 1e-9);
    }
}
