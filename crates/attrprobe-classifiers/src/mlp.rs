//! Multi-layer perceptron trained with candle
//!
//! ReLU hidden layers feed a softmax output over every class; training
//! minimises cross-entropy plus an L2 penalty on connection weights with
//! Adam over shuffled minibatches. Early stopping holds out a validation
//! split, stops once validation accuracy plateaus and restores the best
//! weights seen.

use crate::classifier::{
    check_prediction_input, check_training_input, not_fitted, Classifier, ClassifierKind,
};
use crate::config::MlpConfig;
use crate::weights::RawWeights;
use attrprobe_core::{Error, Result};
use candle_core::{DType, Device, Tensor, Var, D};
use candle_nn::{loss, AdamW, Linear, Module, Optimizer, ParamsAdamW};
use ndarray::Array2;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use tracing::{debug, warn};

/// Smallest training set that still gets a validation split
const MIN_EARLY_STOPPING_ROWS: usize = 10;

#[derive(Debug)]
struct Layer {
    weight: Var,
    bias: Var,
}

impl Layer {
    /// Glorot-uniform initialisation for ReLU networks
    fn init(
        fan_in: usize,
        fan_out: usize,
        rng: &mut StdRng,
        device: &Device,
    ) -> candle_core::Result<Self> {
        let bound = (6.0 / (fan_in + fan_out) as f64).sqrt() as f32;
        let weights: Vec<f32> = (0..fan_in * fan_out)
            .map(|_| rng.gen_range(-bound..bound))
            .collect();
        let biases: Vec<f32> = (0..fan_out).map(|_| rng.gen_range(-bound..bound)).collect();

        Ok(Self {
            weight: Var::from_tensor(&Tensor::from_vec(weights, (fan_out, fan_in), device)?)?,
            bias: Var::from_tensor(&Tensor::from_vec(biases, fan_out, device)?)?,
        })
    }

    fn linear(&self) -> Linear {
        Linear::new(
            self.weight.as_tensor().clone(),
            Some(self.bias.as_tensor().clone()),
        )
    }
}

#[derive(Debug)]
struct Network {
    layers: Vec<Layer>,
}

impl Network {
    fn new(sizes: &[usize], rng: &mut StdRng, device: &Device) -> candle_core::Result<Self> {
        let layers = sizes
            .windows(2)
            .map(|pair| Layer::init(pair[0], pair[1], rng, device))
            .collect::<candle_core::Result<Vec<_>>>()?;
        Ok(Self { layers })
    }

    fn forward(&self, x: &Tensor) -> candle_core::Result<Tensor> {
        let last = self.layers.len().saturating_sub(1);
        let mut h = x.clone();
        for (i, layer) in self.layers.iter().enumerate() {
            h = layer.linear().forward(&h)?;
            if i < last {
                h = h.relu()?;
            }
        }
        Ok(h)
    }

    fn predict(&self, x: &Tensor) -> candle_core::Result<Vec<u32>> {
        self.forward(x)?.argmax(D::Minus1)?.to_vec1::<u32>()
    }

    fn vars(&self) -> Vec<Var> {
        self.layers
            .iter()
            .flat_map(|l| [l.weight.clone(), l.bias.clone()])
            .collect()
    }

    /// `sum |W|^2` over connection weights (biases excluded)
    fn weight_norm(&self, device: &Device) -> candle_core::Result<Tensor> {
        let mut total = Tensor::zeros((), DType::F32, device)?;
        for layer in &self.layers {
            total = total.add(&layer.weight.as_tensor().sqr()?.sum_all()?)?;
        }
        Ok(total)
    }

    fn snapshot(&self) -> candle_core::Result<Vec<Tensor>> {
        self.vars().iter().map(|v| v.as_tensor().copy()).collect()
    }

    fn restore(&self, snapshot: &[Tensor]) -> candle_core::Result<()> {
        for (var, saved) in self.vars().iter().zip(snapshot) {
            var.set(saved)?;
        }
        Ok(())
    }
}

/// Rows of a dataset as candle tensors
struct Split {
    x: Tensor,
    y: Tensor,
    labels: Vec<u32>,
}

impl Split {
    fn new(
        x: &Array2<f64>,
        y: &[usize],
        rows: &[usize],
        device: &Device,
    ) -> candle_core::Result<Self> {
        let p = x.ncols();
        let mut data = Vec::with_capacity(rows.len() * p);
        for &r in rows {
            data.extend(x.row(r).iter().map(|v| *v as f32));
        }
        let labels: Vec<u32> = rows.iter().map(|&r| y[r] as u32).collect();
        Ok(Self {
            x: Tensor::from_vec(data, (rows.len(), p), device)?,
            y: Tensor::from_vec(labels.clone(), rows.len(), device)?,
            labels,
        })
    }

    fn len(&self) -> usize {
        self.labels.len()
    }
}

/// Per-class shuffled hold-out of `ceil(fraction * n_c)` rows, always leaving
/// at least one training row per class
fn stratified_split(
    y: &[usize],
    n_classes: usize,
    fraction: f64,
    rng: &mut StdRng,
) -> (Vec<usize>, Vec<usize>) {
    let mut train = Vec::with_capacity(y.len());
    let mut validation = Vec::new();

    for class in 0..n_classes {
        let mut rows: Vec<usize> = (0..y.len()).filter(|&i| y[i] == class).collect();
        if rows.is_empty() {
            continue;
        }
        rows.shuffle(rng);
        let n_val = ((rows.len() as f64) * fraction).ceil() as usize;
        let n_val = n_val.min(rows.len() - 1);
        validation.extend_from_slice(&rows[..n_val]);
        train.extend_from_slice(&rows[n_val..]);
    }

    train.sort_unstable();
    validation.sort_unstable();
    (train, validation)
}

struct FittedMlp {
    network: Network,
    n_features: usize,
    epochs: usize,
}

/// Multi-layer perceptron classifier
pub struct MlpClassifier {
    config: MlpConfig,
    device: Device,
    fitted: Option<FittedMlp>,
}

impl MlpClassifier {
    pub fn new(config: MlpConfig) -> Self {
        Self {
            config,
            device: Device::Cpu,
            fitted: None,
        }
    }

    /// Epochs run by the last fit
    pub fn epochs(&self) -> Option<usize> {
        self.fitted.as_ref().map(|f| f.epochs)
    }

    fn train(
        &self,
        x: &Array2<f64>,
        y: &[usize],
        n_classes: usize,
    ) -> candle_core::Result<FittedMlp> {
        let cfg = &self.config;
        let device = &self.device;
        let mut rng = StdRng::seed_from_u64(cfg.seed);

        let mut sizes = Vec::with_capacity(cfg.hidden_layers.len() + 2);
        sizes.push(x.ncols());
        sizes.extend(cfg.hidden_layers.iter().copied());
        sizes.push(n_classes);
        let network = Network::new(&sizes, &mut rng, device)?;

        let n = x.nrows();
        let use_validation = cfg.early_stopping && n >= MIN_EARLY_STOPPING_ROWS;
        let (train_rows, validation) = if use_validation {
            let (train_rows, val_rows) =
                stratified_split(y, n_classes, cfg.validation_fraction, &mut rng);
            if val_rows.is_empty() {
                (train_rows, None)
            } else {
                (train_rows, Some(Split::new(x, y, &val_rows, device)?))
            }
        } else {
            ((0..n).collect(), None)
        };
        let train = Split::new(x, y, &train_rows, device)?;

        let mut optimizer = AdamW::new(
            network.vars(),
            ParamsAdamW {
                lr: cfg.learning_rate,
                beta1: cfg.beta1,
                beta2: cfg.beta2,
                eps: cfg.epsilon,
                weight_decay: 0.0,
            },
        )?;

        let batch_size = cfg.batch_size.clamp(1, train.len().max(1));
        let mut order: Vec<u32> = (0..train.len() as u32).collect();

        let mut best_loss = f64::INFINITY;
        let mut best_score = f64::NEG_INFINITY;
        let mut best_weights = None;
        let mut stale_epochs = 0usize;
        let mut epochs = 0usize;

        for _ in 0..cfg.max_iter {
            epochs += 1;
            order.shuffle(&mut rng);

            let mut epoch_loss = 0.0f64;
            for batch in order.chunks(batch_size) {
                let index = Tensor::from_vec(batch.to_vec(), batch.len(), device)?;
                let xb = train.x.index_select(&index, 0)?;
                let yb = train.y.index_select(&index, 0)?;

                let logits = network.forward(&xb)?;
                let penalty = network
                    .weight_norm(device)?
                    .affine(0.5 * cfg.alpha / batch.len() as f64, 0.0)?;
                let batch_loss = loss::cross_entropy(&logits, &yb)?.add(&penalty)?;
                optimizer.backward_step(&batch_loss)?;

                epoch_loss += f64::from(batch_loss.to_scalar::<f32>()?) * batch.len() as f64;
            }
            epoch_loss /= train.len().max(1) as f64;

            if let Some(val) = &validation {
                let predicted = network.predict(&val.x)?;
                let correct = predicted
                    .iter()
                    .zip(&val.labels)
                    .filter(|(p, t)| p == t)
                    .count();
                let score = correct as f64 / val.len() as f64;

                if score < best_score + cfg.tol {
                    stale_epochs += 1;
                } else {
                    stale_epochs = 0;
                }
                if score > best_score {
                    best_score = score;
                    best_weights = Some(network.snapshot()?);
                }
            } else {
                if epoch_loss > best_loss - cfg.tol {
                    stale_epochs += 1;
                } else {
                    stale_epochs = 0;
                }
                best_loss = best_loss.min(epoch_loss);
            }

            if stale_epochs > cfg.n_iter_no_change {
                break;
            }
        }

        if epochs == cfg.max_iter && stale_epochs <= cfg.n_iter_no_change {
            warn!(max_iter = cfg.max_iter, "mlp reached its epoch cap without converging");
        }

        if let Some(saved) = &best_weights {
            network.restore(saved)?;
        }

        debug!(
            epochs,
            validation = use_validation,
            best_score,
            best_loss,
            "mlp training finished"
        );

        Ok(FittedMlp {
            network,
            n_features: x.ncols(),
            epochs,
        })
    }
}

impl Default for MlpClassifier {
    fn default() -> Self {
        Self::new(MlpConfig::default())
    }
}

fn candle_error(context: &str, e: candle_core::Error) -> Error {
    Error::classifier(format!("mlp {}: {}", context, e))
}

impl Classifier for MlpClassifier {
    fn kind(&self) -> ClassifierKind {
        ClassifierKind::Mlp
    }

    fn fit(&mut self, x: &Array2<f64>, y: &[usize], n_classes: usize) -> Result<()> {
        check_training_input(x, y, n_classes)?;
        let fitted = self
            .train(x, y, n_classes)
            .map_err(|e| candle_error("training failed", e))?;
        self.fitted = Some(fitted);
        Ok(())
    }

    fn predict(&self, x: &Array2<f64>) -> Result<Vec<usize>> {
        let fitted = self.fitted.as_ref().ok_or_else(|| not_fitted(self.kind()))?;
        check_prediction_input(x, fitted.n_features)?;

        let rows: Vec<usize> = (0..x.nrows()).collect();
        let labels = vec![0; x.nrows()];
        let predicted = Split::new(x, &labels, &rows, &self.device)
            .and_then(|split| fitted.network.predict(&split.x))
            .map_err(|e| candle_error("prediction failed", e))?;
        Ok(predicted.into_iter().map(|c| c as usize).collect())
    }

    fn raw_weights(&self) -> Result<RawWeights> {
        let fitted = self.fitted.as_ref().ok_or_else(|| not_fitted(self.kind()))?;
        let first = fitted
            .network
            .layers
            .first()
            .ok_or_else(|| Error::internal("mlp has no layers"))?;

        // weights from every input into the first hidden unit
        let weights = first
            .weight
            .as_tensor()
            .get(0)
            .and_then(|row| row.to_dtype(DType::F64))
            .and_then(|row| row.to_vec1::<f64>())
            .map_err(|e| candle_error("weight extraction failed", e))?;
        Ok(RawWeights::Dense(weights))
    }
}
