//! Fresh classifier construction by family

use crate::boosting::BoostingClassifier;
use crate::classifier::{Classifier, ClassifierKind};
use crate::config::ClassifierConfig;
use crate::logistic::LogisticClassifier;
use crate::mlp::MlpClassifier;
use tracing::trace;

/// Builds unfitted classifiers from a fixed configuration
#[derive(Debug, Clone, Default)]
pub struct ClassifierRegistry {
    config: ClassifierConfig,
}

impl ClassifierRegistry {
    pub fn new(config: ClassifierConfig) -> Self {
        Self { config }
    }

    /// Hyperparameters shared by every classifier built here
    pub fn config(&self) -> &ClassifierConfig {
        &self.config
    }

    /// Families in reporting order
    pub fn kinds(&self) -> &'static [ClassifierKind] {
        &ClassifierKind::ALL
    }

    /// A new, unfitted classifier of `kind`
    pub fn create(&self, kind: ClassifierKind) -> Box<dyn Classifier> {
        trace!(classifier = %kind, "creating classifier");
        match kind {
            ClassifierKind::Logistic => {
                Box::new(LogisticClassifier::new(self.config.logistic.clone()))
            }
            ClassifierKind::Mlp => Box::new(MlpClassifier::new(self.config.mlp.clone())),
            ClassifierKind::Xgboost => {
                Box::new(BoostingClassifier::new(self.config.xgboost.clone()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_every_kind() {
        let registry = ClassifierRegistry::default();
        for &kind in registry.kinds() {
            assert_eq!(registry.create(kind).kind(), kind);
        }
    }
}
