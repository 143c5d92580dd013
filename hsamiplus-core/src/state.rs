use ndarray::Array2;

use crate::inputs::{Een, Project};

/// Per-band snow record carried when `een` is `mdj` or `alt`. One array
/// entry per land-cover band (`mdj`) or elevation band (`alt`);
/// struct-of-arrays rather than array-of-structs keeps the per-band
/// arithmetic in `interception.rs` cache-friendly.
#[derive(Debug, Clone)]
pub struct BandedSnow {
    pub couvert_neige: Vec<f64>,
    pub densite_neige: Vec<f64>,
    pub albedo_neige: Vec<f64>,
    pub neige_au_sol: Vec<f64>,
    pub fonte: Vec<f64>,
    pub gel: Vec<f64>,
    pub sol: Vec<f64>,
    pub energie_neige: Vec<f64>,
    pub energie_glace: f64,
}

impl BandedSnow {
    pub fn new(bands: usize) -> Self {
        Self {
            couvert_neige: vec![0.0; bands],
            densite_neige: vec![0.0; bands],
            albedo_neige: vec![0.9; bands],
            neige_au_sol: vec![0.0; bands],
            fonte: vec![0.0; bands],
            gel: vec![0.0; bands],
            sol: vec![0.0; bands],
            energie_neige: vec![0.0; bands],
            energie_glace: 0.0,
        }
    }
}

/// Soil moisture storage. The source stores this as a two-element vector with
/// `sol[1] = NaN` when the one-layer model is active; a tagged option type
/// preserves that semantics without the sentinel.
#[derive(Debug, Clone, Copy)]
pub enum SoilMoisture {
    OneLayer(f64),
    ThreeLayer([f64; 2]),
}

impl SoilMoisture {
    pub fn one_layer(&self) -> f64 {
        match self {
            SoilMoisture::OneLayer(v) => *v,
            SoilMoisture::ThreeLayer(_) => panic!("sol is in the three-layer configuration"),
        }
    }

    pub fn three_layer(&self) -> [f64; 2] {
        match self {
            SoilMoisture::ThreeLayer(v) => *v,
            SoilMoisture::OneLayer(_) => panic!("sol is in the one-layer configuration"),
        }
    }
}

/// The mutable watershed state, carried across steps and mutated exactly once
/// per step by the driver. Submodules each own a documented subset of these
/// fields; none of them hold their own copy.
#[derive(Debug, Clone)]
pub struct State {
    /// `memoire x 3` matrix of water in transit through the surface,
    /// intermediate and wetland-surface unit hydrographs (cm).
    pub eau_hydrogrammes: Array2<f64>,

    pub neige_au_sol: f64,
    pub fonte: f64,
    pub nas_tot: f64,
    pub fonte_tot: f64,
    pub derniere_neige: f64,
    pub gel: f64,

    pub sol: SoilMoisture,
    pub nappe: f64,
    pub reserve: f64,

    /// Present only when `een` is `mdj` or `alt`.
    pub banded: Option<BandedSnow>,

    pub mh_surf: f64,
    pub mh_vol: f64,
    pub ratio_mh: f64,
    pub mhumide: f64,
    pub ratio_qbase: f64,

    pub cumdeg_gel: f64,
    pub obj_gel: f64,
    pub dernier_gel: f64,
    pub reservoir_epaisseur_glace: f64,
    pub reservoir_energie_glace: f64,
    pub reservoir_superficie: f64,
    pub reservoir_superficie_glace: f64,
    pub reservoir_superficie_ref: f64,
    /// Shelf-ice equivalent water depth, one entry per integer km² of
    /// potential deposition (cm). Fixed length 5000.
    pub eeg: Vec<f64>,

    pub ratio_bassin: f64,
    pub ratio_reservoir: f64,
    pub ratio_fixe: f64,
}

impl State {
    /// Allocate and zero-initialise the state the way the orchestrator does
    /// before the warm-up year.
    pub fn init(project: &Project) -> Self {
        let param = &project.param;

        let banded = match project.modules.een {
            Een::Mdj => Some(BandedSnow::new(project.physio.occupation.len())),
            Een::Alt => Some(BandedSnow::new(project.physio.occupation_bande.len())),
            Een::Hsami | Een::Dj => None,
        };

        let sol = match project.modules.sol {
            crate::inputs::Sol::Hsami => SoilMoisture::OneLayer(param.sol_min()),
            crate::inputs::Sol::TroisCouches => {
                SoilMoisture::ThreeLayer([param.cc_couche(0) * param.epaisseur_couche(0), param.cc_couche(1) * param.epaisseur_couche(1)])
            }
        };

        let samax = project.physio.samax;
        let (mh_surf, mh_vol, ratio_mh) = if project.modules.mhumide {
            let mh_surf = param.mh_p_norm() * samax * 100.0;
            let mh_vol = param.mh_p_norm() * (param.mh_hmax() * samax * 100.0 * 10000.0);
            let ratio_mh = mh_surf / (project.superficie[0] * 100.0);
            (mh_surf, mh_vol, ratio_mh)
        } else {
            (1.0, 0.0, 0.0)
        };
        let mhumide = mh_vol * ratio_mh / (mh_surf * 100.0);

        State {
            eau_hydrogrammes: Array2::zeros((project.memoire, 3)),
            neige_au_sol: 0.0,
            fonte: 0.0,
            nas_tot: 0.0,
            fonte_tot: 0.0,
            derniere_neige: 0.0,
            gel: 0.0,
            sol,
            nappe: param.nappe_max(),
            reserve: 0.0,
            banded,
            mh_surf,
            mh_vol,
            ratio_mh,
            mhumide,
            ratio_qbase: 0.0,
            cumdeg_gel: 0.0,
            obj_gel: -200.0,
            dernier_gel: 0.0,
            reservoir_epaisseur_glace: 0.0,
            reservoir_energie_glace: 0.0,
            reservoir_superficie: project.superficie[1],
            reservoir_superficie_glace: 0.0,
            reservoir_superficie_ref: project.superficie[1],
            eeg: vec![0.0; 5000],
            ratio_bassin: 1.0,
            ratio_reservoir: 0.0,
            ratio_fixe: 1.0,
        }
    }
}
