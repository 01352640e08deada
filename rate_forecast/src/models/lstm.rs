//! Stacked LSTM sequence-to-one regressor
//!
//! Architecture: `LSTM(units) -> Dropout -> LSTM(units) -> Dropout -> Dense(1)`,
//! trained on mean squared error with Adam and full backpropagation through
//! time. Gates are laid out `[input, forget, candidate, output]` along the
//! second axis of every weight matrix.

use crate::config::LstmConfig;
use crate::error::{ForecastError, Result};
use crate::models::{ForecastModel, TrainedForecastModel, TrainingSet};
use crate::utils::holdout_split;
use crate::window::windows_to_tensor;
use ndarray::{s, Array, Array1, Array2, Array3, Axis, Dimension, Zip};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Uniform};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

const BETA1: f64 = 0.9;
const BETA2: f64 = 0.999;
const ADAM_EPSILON: f64 = 1e-7;

fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x.clamp(-500.0, 500.0)).exp())
}

/// Glorot-uniform matrix
fn glorot(rows: usize, cols: usize, rng: &mut StdRng) -> Array2<f64> {
    let limit = (6.0 / (rows + cols) as f64).sqrt();
    let dist = Uniform::new_inclusive(-limit, limit);
    Array2::from_shape_fn((rows, cols), |_| dist.sample(rng))
}

/// Inverted-dropout mask: kept units are scaled by `1 / (1 - rate)`
fn dropout_mask(shape: (usize, usize), rate: f64, rng: &mut StdRng) -> Array2<f64> {
    if rate <= 0.0 {
        return Array2::ones(shape);
    }
    let keep = 1.0 - rate;
    Array2::from_shape_fn(shape, |_| if rng.gen::<f64>() < keep { 1.0 / keep } else { 0.0 })
}

/// One recurrent layer
#[derive(Debug, Clone)]
struct LstmLayer {
    hidden: usize,
    /// Input weights `(input_size, 4 * hidden)`
    w: Array2<f64>,
    /// Recurrent weights `(hidden, 4 * hidden)`
    u: Array2<f64>,
    /// Bias `(4 * hidden)`, forget slice starts at one
    b: Array1<f64>,
}

/// Activations kept from the forward pass of one timestep
struct StepCache {
    x: Array2<f64>,
    h_prev: Array2<f64>,
    c_prev: Array2<f64>,
    i: Array2<f64>,
    f: Array2<f64>,
    g: Array2<f64>,
    o: Array2<f64>,
    tanh_c: Array2<f64>,
}

#[derive(Debug, Clone)]
struct LayerGrads {
    w: Array2<f64>,
    u: Array2<f64>,
    b: Array1<f64>,
}

impl LstmLayer {
    fn new(input_size: usize, hidden: usize, rng: &mut StdRng) -> Self {
        let mut b = Array1::zeros(4 * hidden);
        b.slice_mut(s![hidden..2 * hidden]).fill(1.0);
        Self {
            hidden,
            w: glorot(input_size, 4 * hidden, rng),
            u: glorot(hidden, 4 * hidden, rng),
            b,
        }
    }

    /// Run the layer over `xs` (one `(batch, input)` matrix per timestep)
    fn forward(&self, xs: &[Array2<f64>]) -> (Vec<Array2<f64>>, Vec<StepCache>) {
        let batch = xs.first().map_or(0, |x| x.nrows());
        let hs = self.hidden;
        let mut h = Array2::zeros((batch, hs));
        let mut c = Array2::zeros((batch, hs));
        let mut outputs = Vec::with_capacity(xs.len());
        let mut caches = Vec::with_capacity(xs.len());

        for x in xs {
            let z = x.dot(&self.w) + h.dot(&self.u) + &self.b;
            let i = z.slice(s![.., 0..hs]).mapv(sigmoid);
            let f = z.slice(s![.., hs..2 * hs]).mapv(sigmoid);
            let g = z.slice(s![.., 2 * hs..3 * hs]).mapv(f64::tanh);
            let o = z.slice(s![.., 3 * hs..]).mapv(sigmoid);

            let c_next = &f * &c + &i * &g;
            let tanh_c = c_next.mapv(f64::tanh);
            let h_next = &o * &tanh_c;

            caches.push(StepCache {
                x: x.clone(),
                h_prev: h,
                c_prev: c,
                i,
                f,
                g,
                o,
                tanh_c,
            });
            outputs.push(h_next.clone());
            h = h_next;
            c = c_next;
        }

        (outputs, caches)
    }

    /// Backpropagate `dhs` (loss gradient w.r.t. each output) through time
    fn backward(&self, caches: &[StepCache], dhs: &[Array2<f64>]) -> (LayerGrads, Vec<Array2<f64>>) {
        let hs = self.hidden;
        let batch = caches.first().map_or(0, |c| c.x.nrows());
        let mut grads = LayerGrads {
            w: Array2::zeros(self.w.raw_dim()),
            u: Array2::zeros(self.u.raw_dim()),
            b: Array1::zeros(self.b.raw_dim()),
        };
        let mut dh_next = Array2::zeros((batch, hs));
        let mut dc_next = Array2::zeros((batch, hs));
        let mut dxs = vec![Array2::zeros((batch, self.w.nrows())); caches.len()];

        for t in (0..caches.len()).rev() {
            let cache = &caches[t];
            let dh = &dhs[t] + &dh_next;

            let d_o = &dh * &cache.tanh_c;
            let dc = &dh * &cache.o * &cache.tanh_c.mapv(|v| 1.0 - v * v) + &dc_next;
            let d_f = &dc * &cache.c_prev;
            let d_i = &dc * &cache.g;
            let d_g = &dc * &cache.i;
            dc_next = &dc * &cache.f;

            let mut dz = Array2::zeros((batch, 4 * hs));
            dz.slice_mut(s![.., 0..hs])
                .assign(&(d_i * &cache.i.mapv(|v| v * (1.0 - v))));
            dz.slice_mut(s![.., hs..2 * hs])
                .assign(&(d_f * &cache.f.mapv(|v| v * (1.0 - v))));
            dz.slice_mut(s![.., 2 * hs..3 * hs])
                .assign(&(d_g * &cache.g.mapv(|v| 1.0 - v * v)));
            dz.slice_mut(s![.., 3 * hs..])
                .assign(&(d_o * &cache.o.mapv(|v| v * (1.0 - v))));

            grads.w += &cache.x.t().dot(&dz);
            grads.u += &cache.h_prev.t().dot(&dz);
            grads.b += &dz.sum_axis(Axis(0));
            dxs[t] = dz.dot(&self.w.t());
            dh_next = dz.dot(&self.u.t());
        }

        (grads, dxs)
    }
}

/// Both recurrent layers plus the linear head
#[derive(Debug, Clone)]
struct Network {
    layer1: LstmLayer,
    layer2: LstmLayer,
    w_out: Array1<f64>,
    b_out: Array1<f64>,
}

struct Gradients {
    layer1: LayerGrads,
    layer2: LayerGrads,
    w_out: Array1<f64>,
    b_out: Array1<f64>,
}

/// Rows of a `(samples, timesteps, 1)` tensor as one `(batch, 1)` matrix per timestep
fn batch_inputs(tensor: &Array3<f64>, rows: &[usize]) -> Vec<Array2<f64>> {
    let batch = tensor.select(Axis(0), rows);
    (0..batch.len_of(Axis(1)))
        .map(|t| batch.index_axis(Axis(1), t).to_owned())
        .collect()
}

impl Network {
    fn new(units: usize, rng: &mut StdRng) -> Self {
        let layer1 = LstmLayer::new(1, units, rng);
        let layer2 = LstmLayer::new(units, units, rng);
        let w_out = glorot(units, 1, rng).column(0).to_owned();
        Self {
            layer1,
            layer2,
            w_out,
            b_out: Array1::zeros(1),
        }
    }

    fn units(&self) -> usize {
        self.layer2.hidden
    }

    /// Inference pass, dropout disabled
    fn predict(&self, xs: &[Array2<f64>]) -> Array1<f64> {
        let batch = xs.first().map_or(0, |x| x.nrows());
        let (hs1, _) = self.layer1.forward(xs);
        let (hs2, _) = self.layer2.forward(&hs1);
        match hs2.last() {
            Some(last) => last.dot(&self.w_out) + self.b_out[0],
            None => Array1::from_elem(batch, self.b_out[0]),
        }
    }

    /// Mean squared error of the batch and its gradient w.r.t. every weight
    fn loss_and_gradients(
        &self,
        xs: &[Array2<f64>],
        y_true: &Array1<f64>,
        dropout: f64,
        rng: &mut StdRng,
    ) -> (f64, Gradients) {
        let batch = y_true.len();
        let units = self.units();
        let steps = xs.len();

        let (hs1, cache1) = self.layer1.forward(xs);
        let masks1: Vec<Array2<f64>> = hs1
            .iter()
            .map(|_| dropout_mask((batch, units), dropout, rng))
            .collect();
        let dropped1: Vec<Array2<f64>> = hs1.iter().zip(&masks1).map(|(h, m)| h * m).collect();

        let (hs2, cache2) = self.layer2.forward(&dropped1);
        let mask2 = dropout_mask((batch, units), dropout, rng);
        let last = hs2
            .last()
            .cloned()
            .unwrap_or_else(|| Array2::zeros((batch, units)));
        let dropped2 = &last * &mask2;

        let y = dropped2.dot(&self.w_out) + self.b_out[0];
        let err = &y - y_true;
        let loss = err.mapv(|e| e * e).mean().unwrap_or(0.0);

        let dy = err * (2.0 / batch as f64);
        let w_out = dropped2.t().dot(&dy);
        let b_out = Array1::from_elem(1, dy.sum());
        let d_dropped2 = dy
            .view()
            .insert_axis(Axis(1))
            .dot(&self.w_out.view().insert_axis(Axis(0)));

        let mut dhs2 = vec![Array2::zeros((batch, units)); steps];
        if let Some(d_last) = dhs2.last_mut() {
            *d_last = d_dropped2 * &mask2;
        }
        let (layer2, dxs2) = self.layer2.backward(&cache2, &dhs2);
        let dhs1: Vec<Array2<f64>> = dxs2.iter().zip(&masks1).map(|(d, m)| d * m).collect();
        let (layer1, _) = self.layer1.backward(&cache1, &dhs1);

        (
            loss,
            Gradients {
                layer1,
                layer2,
                w_out,
                b_out,
            },
        )
    }
}

/// First and second moment estimates for one parameter tensor
#[derive(Debug, Clone)]
struct Moments<D: Dimension> {
    m: Array<f64, D>,
    v: Array<f64, D>,
}

impl<D: Dimension> Moments<D> {
    fn like(param: &Array<f64, D>) -> Self {
        Self {
            m: Array::zeros(param.raw_dim()),
            v: Array::zeros(param.raw_dim()),
        }
    }

    fn apply(&mut self, param: &mut Array<f64, D>, grad: &Array<f64, D>, step_size: f64) {
        Zip::from(param)
            .and(grad)
            .and(&mut self.m)
            .and(&mut self.v)
            .for_each(|p, &g, m, v| {
                *m = BETA1 * *m + (1.0 - BETA1) * g;
                *v = BETA2 * *v + (1.0 - BETA2) * g * g;
                *p -= step_size * *m / (v.sqrt() + ADAM_EPSILON);
            });
    }
}

#[derive(Debug, Clone)]
struct LayerMoments {
    w: Moments<ndarray::Ix2>,
    u: Moments<ndarray::Ix2>,
    b: Moments<ndarray::Ix1>,
}

impl LayerMoments {
    fn like(layer: &LstmLayer) -> Self {
        Self {
            w: Moments::like(&layer.w),
            u: Moments::like(&layer.u),
            b: Moments::like(&layer.b),
        }
    }

    fn apply(&mut self, layer: &mut LstmLayer, grads: &LayerGrads, step_size: f64) {
        self.w.apply(&mut layer.w, &grads.w, step_size);
        self.u.apply(&mut layer.u, &grads.u, step_size);
        self.b.apply(&mut layer.b, &grads.b, step_size);
    }
}

/// Adam optimizer state for the whole network
#[derive(Debug, Clone)]
struct Adam {
    learning_rate: f64,
    t: i32,
    layer1: LayerMoments,
    layer2: LayerMoments,
    w_out: Moments<ndarray::Ix1>,
    b_out: Moments<ndarray::Ix1>,
}

impl Adam {
    fn new(network: &Network, learning_rate: f64) -> Self {
        Self {
            learning_rate,
            t: 0,
            layer1: LayerMoments::like(&network.layer1),
            layer2: LayerMoments::like(&network.layer2),
            w_out: Moments::like(&network.w_out),
            b_out: Moments::like(&network.b_out),
        }
    }

    fn step(&mut self, network: &mut Network, grads: &Gradients) {
        self.t += 1;
        let step_size = self.learning_rate * (1.0 - BETA2.powi(self.t)).sqrt()
            / (1.0 - BETA1.powi(self.t));
        self.layer1.apply(&mut network.layer1, &grads.layer1, step_size);
        self.layer2.apply(&mut network.layer2, &grads.layer2, step_size);
        self.w_out.apply(&mut network.w_out, &grads.w_out, step_size);
        self.b_out.apply(&mut network.b_out, &grads.b_out, step_size);
    }
}

/// Per-epoch losses; the holdout loss is for monitoring only
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrainingHistory {
    /// Mean training loss per epoch
    pub train_loss: Vec<f64>,
    /// Holdout loss per epoch, absent when nothing is held out
    pub validation_loss: Vec<Option<f64>>,
}

/// Untrained stacked-LSTM regressor
#[derive(Debug, Clone)]
pub struct LstmRegressor {
    name: String,
    config: LstmConfig,
}

/// Fitted stacked-LSTM regressor
#[derive(Debug, Clone)]
pub struct TrainedLstm {
    name: String,
    look_back: usize,
    network: Network,
    history: TrainingHistory,
}

impl LstmRegressor {
    /// Create a regressor from its hyperparameters
    pub fn new(config: LstmConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            name: format!("LSTM({0})-LSTM({0})-Dense(1)", config.units),
            config,
        })
    }

    /// Same architecture with a different epoch count
    pub fn with_epochs(mut self, epochs: usize) -> Result<Self> {
        self.config.epochs = epochs;
        self.config.validate()?;
        Ok(self)
    }

    /// Hyperparameters in use
    pub fn config(&self) -> &LstmConfig {
        &self.config
    }
}

impl ForecastModel for LstmRegressor {
    type Trained = TrainedLstm;

    fn train(&self, data: &TrainingSet<'_>) -> Result<TrainedLstm> {
        let n = data.inputs.len();
        if n == 0 {
            return Err(ForecastError::insufficient(1, 0, "training the sequence regressor"));
        }
        if data.targets.len() != n {
            return Err(ForecastError::ShapeMismatch {
                expected: n,
                got: data.targets.len(),
            });
        }
        if let Some(bad) = data.inputs.iter().find(|w| w.len() != data.look_back) {
            return Err(ForecastError::ShapeMismatch {
                expected: data.look_back,
                got: bad.len(),
            });
        }

        let cfg = &self.config;
        let mut rng = match cfg.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        // Trailing windows are held out before any shuffling
        let rows: Vec<usize> = (0..n).collect();
        let (train_rows, holdout) = holdout_split(&rows, cfg.validation_fraction);
        let split = train_rows.len();
        let mut order = train_rows.to_vec();
        let tensor = windows_to_tensor(data.inputs, data.look_back);
        let holdout_xs = batch_inputs(&tensor, holdout);
        let holdout_y = Array1::from_shape_fn(holdout.len(), |r| data.targets[holdout[r]]);

        let mut network = Network::new(cfg.units, &mut rng);
        let mut adam = Adam::new(&network, cfg.learning_rate);
        let mut history = TrainingHistory::default();

        info!(
            model = %self.name,
            windows = split,
            held_out = holdout.len(),
            epochs = cfg.epochs,
            "training sequence regressor"
        );

        for epoch in 1..=cfg.epochs {
            data.cancel.check(&format!("epoch {} of {}", epoch, cfg.epochs))?;
            if cfg.shuffle {
                order.shuffle(&mut rng);
            }

            let mut epoch_loss = 0.0;
            for rows in order.chunks(cfg.batch_size) {
                let xs = batch_inputs(&tensor, rows);
                let y = Array1::from_shape_fn(rows.len(), |r| data.targets[rows[r]]);
                let (loss, grads) = network.loss_and_gradients(&xs, &y, cfg.dropout, &mut rng);
                if !loss.is_finite() {
                    return Err(ForecastError::NumericalFault(format!(
                        "training loss diverged at epoch {}",
                        epoch
                    )));
                }
                adam.step(&mut network, &grads);
                epoch_loss += loss * rows.len() as f64;
            }
            let train_loss = epoch_loss / split as f64;

            let validation_loss = if holdout.is_empty() {
                None
            } else {
                let predicted = network.predict(&holdout_xs);
                (&predicted - &holdout_y).mapv(|e| e * e).mean()
            };

            debug!(epoch, train_loss, ?validation_loss, "epoch finished");
            history.train_loss.push(train_loss);
            history.validation_loss.push(validation_loss);
        }

        info!(
            model = %self.name,
            final_loss = history.train_loss.last().copied().unwrap_or_default(),
            "sequence regressor trained"
        );

        Ok(TrainedLstm {
            name: self.name.clone(),
            look_back: data.look_back,
            network,
            history,
        })
    }

    fn name(&self) -> &str {
        &self.name
    }
}

impl TrainedLstm {
    /// Loss curves recorded during training
    pub fn history(&self) -> &TrainingHistory {
        &self.history
    }

    /// Window length the network was trained on
    pub fn look_back(&self) -> usize {
        self.look_back
    }
}

impl TrainedForecastModel for TrainedLstm {
    fn predict_one(&self, window: &[f64]) -> Result<f64> {
        let predicted = self.predict_batch(&[window.to_vec()])?;
        predicted
            .first()
            .copied()
            .ok_or_else(|| ForecastError::NumericalFault("empty prediction".to_string()))
    }

    fn predict_batch(&self, windows: &[Vec<f64>]) -> Result<Vec<f64>> {
        if let Some(bad) = windows.iter().find(|w| w.len() != self.look_back) {
            return Err(ForecastError::ShapeMismatch {
                expected: self.look_back,
                got: bad.len(),
            });
        }
        if windows.is_empty() {
            return Ok(Vec::new());
        }

        let rows: Vec<usize> = (0..windows.len()).collect();
        let xs = batch_inputs(&windows_to_tensor(windows, self.look_back), &rows);
        let predicted = self.network.predict(&xs).to_vec();
        if predicted.iter().any(|v| !v.is_finite()) {
            return Err(ForecastError::NumericalFault(
                "sequence regressor produced a non-finite prediction".to_string(),
            ));
        }
        Ok(predicted)
    }

    fn name(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cancel::CancellationToken;
    use crate::window::sliding_windows;
    use approx::assert_relative_eq;

    fn small_config() -> LstmConfig {
        LstmConfig {
            units: 8,
            dropout: 0.0,
            learning_rate: 0.01,
            epochs: 30,
            batch_size: 16,
            validation_fraction: 0.2,
            shuffle: true,
            seed: Some(7),
        }
    }

    fn sine_series(len: usize) -> Vec<f64> {
        (0..len)
            .map(|i| 0.5 + 0.4 * (i as f64 * std::f64::consts::PI / 6.0).sin())
            .collect()
    }

    fn batch_loss(network: &Network, xs: &[Array2<f64>], y: &Array1<f64>) -> f64 {
        let mut rng = StdRng::seed_from_u64(0);
        network.loss_and_gradients(xs, y, 0.0, &mut rng).0
    }

    #[test]
    fn test_gradients_match_finite_differences() {
        let mut rng = StdRng::seed_from_u64(42);
        let network = Network::new(3, &mut rng);
        let inputs = vec![vec![0.1, 0.4, 0.7], vec![0.9, 0.3, 0.2]];
        let xs = batch_inputs(&windows_to_tensor(&inputs, 3), &[0, 1]);
        let y = Array1::from_vec(vec![0.5, 0.8]);

        let (_, grads) = network.loss_and_gradients(&xs, &y, 0.0, &mut rng);
        let eps = 1e-6;

        let numeric = |perturb: &dyn Fn(&mut Network, f64)| {
            let mut plus = network.clone();
            perturb(&mut plus, eps);
            let mut minus = network.clone();
            perturb(&mut minus, -eps);
            (batch_loss(&plus, &xs, &y) - batch_loss(&minus, &xs, &y)) / (2.0 * eps)
        };

        let d = numeric(&|n, e| n.layer1.w[[0, 5]] += e);
        assert_relative_eq!(grads.layer1.w[[0, 5]], d, epsilon = 1e-7, max_relative = 1e-4);

        let d = numeric(&|n, e| n.layer1.u[[2, 10]] += e);
        assert_relative_eq!(grads.layer1.u[[2, 10]], d, epsilon = 1e-7, max_relative = 1e-4);

        let d = numeric(&|n, e| n.layer2.w[[1, 4]] += e);
        assert_relative_eq!(grads.layer2.w[[1, 4]], d, epsilon = 1e-7, max_relative = 1e-4);

        let d = numeric(&|n, e| n.layer2.b[7] += e);
        assert_relative_eq!(grads.layer2.b[7], d, epsilon = 1e-7, max_relative = 1e-4);

        let d = numeric(&|n, e| n.w_out[1] += e);
        assert_relative_eq!(grads.w_out[1], d, epsilon = 1e-7, max_relative = 1e-4);

        let d = numeric(&|n, e| n.b_out[0] += e);
        assert_relative_eq!(grads.b_out[0], d, epsilon = 1e-7, max_relative = 1e-4);
    }

    #[test]
    fn test_training_reduces_loss() {
        let series = sine_series(60);
        let (inputs, targets) = sliding_windows(&series, 6);
        let cancel = CancellationToken::new();
        let data = TrainingSet {
            inputs: &inputs,
            targets: &targets,
            series: &series,
            look_back: 6,
            cancel: &cancel,
        };

        let trained = LstmRegressor::new(small_config()).unwrap().train(&data).unwrap();
        let history = trained.history();
        assert_eq!(history.train_loss.len(), 30);
        assert!(history.validation_loss.iter().all(|v| v.is_some()));
        assert!(history.train_loss[29] < history.train_loss[0]);

        let next = trained.predict_one(&inputs[0]).unwrap();
        assert!(next.is_finite());
    }

    #[test]
    fn test_seeded_training_is_reproducible() {
        let series = sine_series(30);
        let (inputs, targets) = sliding_windows(&series, 4);
        let cancel = CancellationToken::new();
        let data = TrainingSet {
            inputs: &inputs,
            targets: &targets,
            series: &series,
            look_back: 4,
            cancel: &cancel,
        };
        let mut config = small_config();
        config.epochs = 3;
        config.dropout = 0.3;

        let model = LstmRegressor::new(config).unwrap();
        let a = model.train(&data).unwrap().predict_one(&inputs[3]).unwrap();
        let b = model.train(&data).unwrap().predict_one(&inputs[3]).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_wrong_window_length() {
        let series = sine_series(20);
        let (inputs, targets) = sliding_windows(&series, 4);
        let cancel = CancellationToken::new();
        let data = TrainingSet {
            inputs: &inputs,
            targets: &targets,
            series: &series,
            look_back: 4,
            cancel: &cancel,
        };
        let mut config = small_config();
        config.epochs = 1;
        let trained = LstmRegressor::new(config).unwrap().train(&data).unwrap();
        assert!(matches!(
            trained.predict_one(&[0.1, 0.2]),
            Err(ForecastError::ShapeMismatch { expected: 4, got: 2 })
        ));
    }

    #[test]
    fn test_cancelled_before_first_epoch() {
        let series = sine_series(20);
        let (inputs, targets) = sliding_windows(&series, 4);
        let cancel = CancellationToken::new();
        cancel.cancel();
        let data = TrainingSet {
            inputs: &inputs,
            targets: &targets,
            series: &series,
            look_back: 4,
            cancel: &cancel,
        };
        let result = LstmRegressor::new(small_config()).unwrap().train(&data);
        assert!(matches!(result, Err(ForecastError::Cancelled(_))));
    }
}
