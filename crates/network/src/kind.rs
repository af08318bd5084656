/// Family of a probabilistic network, deciding which algorithms apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NetworkType {
    BayesianNetwork,
    TuningNetwork,
    InfluenceDiagram,
    DecisionAnalysisNetwork,
}

impl TryFrom<&str> for NetworkType {
    type Error = anyhow::Error;
    fn try_from(s: &str) -> Result<Self, Self::Error> {
        match s.trim().to_lowercase().replace(['-', '_', ' '], "").as_str() {
            "bn" | "bayesiannetwork" => Ok(Self::BayesianNetwork),
            "tuning" | "tuningnetwork" => Ok(Self::TuningNetwork),
            "id" | "influencediagram" => Ok(Self::InfluenceDiagram),
            "dan" | "decisionanalysisnetwork" => Ok(Self::DecisionAnalysisNetwork),
            _ => Err(anyhow::anyhow!("unknown network type: {}", s)),
        }
    }
}

impl std::fmt::Display for NetworkType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BayesianNetwork => write!(f, "BayesianNetwork"),
            Self::TuningNetwork => write!(f, "TuningNetwork"),
            Self::InfluenceDiagram => write!(f, "InfluenceDiagram"),
            Self::DecisionAnalysisNetwork => write!(f, "DecisionAnalysisNetwork"),
        }
    }
}
