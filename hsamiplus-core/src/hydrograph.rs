//! Unit hydrograph generation.

use crate::error::Warning;

/// Discretised beta-shaped impulse response of length `memoire * nb_pas`:
/// `h(t) = t^(mode*forme) * exp(-forme*t/nb_pas)` for `t = 1..=len`,
/// normalised to unit sum.
pub fn hsami_hydrogramme(mode: f64, forme: f64, nb_pas: u32, memoire: usize) -> Vec<f64> {
    let len = memoire * nb_pas as usize;
    let mut h: Vec<f64> = (1..=len)
        .map(|t| {
            let t = t as f64;
            t.powf(mode * forme) * (-forme * t / nb_pas as f64).exp()
        })
        .collect();

    let sum: f64 = h.iter().sum();
    if sum > 0.0 {
        for v in h.iter_mut() {
            *v /= sum;
        }
    }
    h
}

/// Which hydrograph is being resolved, for the warning message only.
#[derive(Debug, Clone, Copy)]
pub enum HydrographKind {
    Surface,
    Intermediate,
}

/// Use an imposed hydrograph verbatim if its length matches `memoire`;
/// otherwise fall back to the computed beta shape and log a warning if an
/// imposed one was supplied but rejected.
pub fn resolve_hydrograph(imposed: Option<&[f64]>, mode: f64, forme: f64, nb_pas: u32, memoire: usize, kind: HydrographKind) -> Vec<f64> {
    if let Some(h) = imposed {
        if h.len() == memoire {
            return h.to_vec();
        }
        let name = match kind {
            HydrographKind::Surface => "hu_surface",
            HydrographKind::Intermediate => "hu_inter",
        };
        log::warn!(
            "{}",
            Warning::ImposedHydrographLengthMismatch { name, expected: memoire, got: h.len() }
        );
    }
    hsami_hydrogramme(mode, forme, nb_pas, memoire)
}

#[cfg(test)]
mod tests {
    use super::*;
    use float_cmp::assert_approx_eq;

    #[test]
    fn hydrograph_sums_to_one() {
        let h = hsami_hydrogramme(2.0, 3.0, 4, 5);
        let sum: f64 = h.iter().sum();
        assert_approx_eq!(f64, sum, 1.0, epsilon = 1e-12);
        assert_eq!(h.len(), 20);
    }

    #[test]
    fn imposed_hydrograph_of_matching_length_is_used_verbatim() {
        let imposed = vec![0.25, 0.25, 0.25, 0.25];
        let h = resolve_hydrograph(Some(&imposed), 2.0, 3.0, 1, 4, HydrographKind::Surface);
        assert_eq!(h, imposed);
    }

    #[test]
    fn mismatched_imposed_hydrograph_falls_back_to_computed() {
        let imposed = vec![1.0, 1.0];
        let h = resolve_hydrograph(Some(&imposed), 2.0, 3.0, 1, 4, HydrographKind::Surface);
        assert_eq!(h.len(), 4);
        assert_ne!(h, imposed);
    }
}
