//! Lightweight SWOT digest for a cultivated block.

use serde::{Deserialize, Serialize};

use crate::finding::{Recommendation, Severity};

const MAX_ITEMS: usize = 4;

/// Qualitative signals from the latest field observation of an asset.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldFlags {
    pub pests: bool,
    pub disease: bool,
}

impl FieldFlags {
    pub fn any(&self) -> bool {
        self.pests || self.disease
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Swot {
    pub strengths: Vec<String>,
    pub weaknesses: Vec<String>,
    pub opportunities: Vec<String>,
    pub threats: Vec<String>,
}

/// Derive a SWOT summary from a block's recommendations and field flags.
pub fn swot(recommendations: &[Recommendation], flags: FieldFlags) -> Swot {
    let mut out = Swot::default();

    if recommendations.iter().all(|r| r.severity == Severity::Ok) {
        out.strengths
            .push("Stabilité des paramètres agro-environnementaux (capteur 7-en-1).".to_string());
    } else {
        out.weaknesses
            .push("Au moins un indicateur hors seuil, besoin d'ajustement opérationnel.".to_string());
    }

    if flags.any() {
        out.threats.push(
            "Signaux terrain: maladies/ravageurs déclarés. Renforcer surveillance & traitement adapté."
                .to_string(),
        );
    } else {
        out.strengths
            .push("Aucun signal terrain majeur (maladies/ravageurs) sur la dernière observation.".to_string());
    }

    out.opportunities.push(
        "Standardiser la collecte (capteurs + fiches terrain) pour produire des rapports et attirer des bailleurs."
            .to_string(),
    );
    out.opportunities
        .push("Comparer blocs/cultures (Banane vs Taro) pour optimiser eau & fertilisation.".to_string());

    for list in [
        &mut out.strengths,
        &mut out.weaknesses,
        &mut out.opportunities,
        &mut out.threats,
    ] {
        list.truncate(MAX_ITEMS);
    }
    out
}
