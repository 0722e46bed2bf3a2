use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::activation::activation::{sigmoid_backward, sigmoid_matrix};
use crate::data::layout::DomainLayout;
use crate::data::provider::DataProvider;
use crate::error::{DdnetError, ReprKind, Result};
use crate::layers::dense::{Bias, Layer, Projection};
use crate::loss::bce::BceLoss;
use crate::math::matrix::Matrix;
use crate::network::params::{NetworkState, ParamId, ParamMap};
use crate::network::spec::{InitType, NetConfig};

/// Activations of one forward pass, kept for back-propagation.
#[derive(Debug, Clone)]
pub struct ForwardCache {
    pub item: Matrix,
    pub context: Matrix,
    /// σ of the combined item/context pre-activations.
    pub rep: Matrix,
    pub hidden: Matrix,
    pub output: Matrix,
}

/// Feed-forward network mapping (item, context) pairs to attributes:
///
/// ```text
/// item ──► item_to_rep ─┐
///                       ├─ sum or concat ─ σ ─► rep_to_hidden ─ σ ─► hidden_to_attr ─ σ ─► attributes
/// context ─► ctx_to_rep ┘
/// ```
///
/// The network owns its training set, generated once at construction, and
/// the single RNG behind initialization, shuffling, and holdout choices.
pub struct DisjointDomainNet {
    pub config: NetConfig,

    pub n_domains: usize,
    pub items_per_domain: usize,
    pub ctx_per_domain: usize,
    pub n_items: usize,
    pub n_contexts: usize,
    pub n_attributes: usize,
    pub n_inputs: usize,
    pub attrs_set_per_item: usize,

    /// Width of the item half of the representation (the raw item width when
    /// the item layer is skipped, the full width when merged).
    pub item_repr_size: usize,
    pub ctx_repr_size: usize,
    pub repr_size: usize,
    pub hidden_size: usize,

    pub(crate) item_to_rep: Projection,
    pub(crate) ctx_to_rep: Projection,
    pub(crate) rep_to_hidden: Layer,
    pub(crate) hidden_to_attr: Layer,
    /// Accumulated gradients, one entry per trainable parameter.
    pub(crate) grads: ParamMap,

    pub x_item: Matrix,
    pub x_context: Matrix,
    pub y: Matrix,

    pub items: Matrix,
    pub item_names: Vec<String>,
    pub contexts: Matrix,
    pub context_names: Vec<String>,

    pub(crate) rng: StdRng,
}

impl DisjointDomainNet {
    /// Builds a network on the default `DomainLayout` stimuli.
    pub fn new(config: NetConfig) -> Result<DisjointDomainNet> {
        config.validate()?;
        let layout = DomainLayout::new(
            config.ctx_per_domain,
            config.attrs_per_context,
            config.attrs_set_per_item,
            config.n_domains,
            &config.cluster_info,
            config.last_domain_cluster_info.as_deref(),
            config.repeat_attrs_over_domains,
        )?;
        DisjointDomainNet::with_provider(config, &layout)
    }

    /// Builds a network on stimuli from any provider. The domain sizes in
    /// `config` are ignored in favour of the provider's.
    pub fn with_provider(config: NetConfig, provider: &dyn DataProvider) -> Result<DisjointDomainNet> {
        config.validate()?;

        let rng = match config.rng_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        let n_items = provider.n_items();
        let n_contexts = provider.n_contexts();
        let n_attributes = provider.n_attributes();

        let (item_repr_size, ctx_repr_size, repr_size) = if config.merged_repr {
            let combined = config.item_repr_units + config.ctx_repr_units;
            (combined, combined, combined)
        } else {
            let item = if config.use_item_repr { config.item_repr_units } else { n_items };
            let ctx = if config.use_ctx_repr { config.ctx_repr_units } else { n_contexts };
            (item, ctx, item + ctx)
        };
        let hidden_size = config.hidden_units;

        let make_bias = |n_units: usize| {
            if config.fix_biases {
                Bias::fixed(n_units, config.fixed_bias)
            } else {
                Bias::trainable(n_units)
            }
        };

        let item_to_rep = if config.use_item_repr {
            Projection::Linear(Layer::new(n_items, item_repr_size, make_bias(item_repr_size)))
        } else {
            Projection::Identity { width: n_items }
        };
        let ctx_to_rep = if config.use_ctx_repr {
            Projection::Linear(Layer::new(n_contexts, ctx_repr_size, make_bias(ctx_repr_size)))
        } else {
            Projection::Identity { width: n_contexts }
        };
        let rep_to_hidden = Layer::new(repr_size, hidden_size, make_bias(hidden_size));
        let hidden_to_attr = Layer::new(hidden_size, n_attributes, make_bias(n_attributes));

        let mats = provider.io_mats();
        let n_inputs = n_items * n_contexts;
        check_shape(&mats.x_item, (n_inputs, n_items))?;
        check_shape(&mats.x_context, (n_inputs, n_contexts))?;
        check_shape(&mats.y, (n_inputs, n_attributes))?;

        let (items, item_names) = provider.items();
        let (contexts, context_names) = provider.contexts();
        check_shape(&items, (n_items, n_items))?;
        check_shape(&contexts, (n_contexts, n_contexts))?;

        let mut net = DisjointDomainNet {
            config,
            n_domains: provider.n_domains(),
            items_per_domain: provider.items_per_domain(),
            ctx_per_domain: provider.ctx_per_domain(),
            n_items,
            n_contexts,
            n_attributes,
            n_inputs,
            attrs_set_per_item: provider.attrs_set_per_item(),
            item_repr_size,
            ctx_repr_size,
            repr_size,
            hidden_size,
            item_to_rep,
            ctx_to_rep,
            rep_to_hidden,
            hidden_to_attr,
            grads: ParamMap::new(),
            x_item: mats.x_item,
            x_context: mats.x_context,
            y: mats.y,
            items,
            item_names,
            contexts,
            context_names,
            rng,
        };

        net.init_params();
        net.grads = net
            .named_params()
            .into_iter()
            .map(|(id, p)| (id, Matrix::zeros(p.rows, p.cols)))
            .collect();

        Ok(net)
    }

    fn init_params(&mut self) {
        let init = self.config.param_init_type;
        let scale = self.config.param_init_scale;
        let DisjointDomainNet { item_to_rep, ctx_to_rep, rep_to_hidden, hidden_to_attr, rng, .. } = self;

        for (id, param) in collect_params_mut(item_to_rep, ctx_to_rep, rep_to_hidden, hidden_to_attr) {
            let (rows, cols) = param.shape();
            *param = match init {
                InitType::Normal => Matrix::normal(rows, cols, scale, &mut *rng),
                InitType::Uniform => Matrix::uniform(rows, cols, scale, &mut *rng),
                InitType::Default if id.is_bias() => Matrix::zeros(rows, cols),
                InitType::Default => Matrix::xavier(rows, cols, &mut *rng),
            };
        }
    }

    pub fn has_item_repr(&self) -> bool {
        self.item_to_rep.layer().is_some()
    }

    pub fn has_ctx_repr(&self) -> bool {
        self.ctx_to_rep.layer().is_some()
    }

    // -----------------------------------------------------------------------
    // Forward computation
    // -----------------------------------------------------------------------

    /// σ(item · W + b) through the item representation layer.
    pub fn calc_item_repr(&self, item: &Matrix) -> Result<Matrix> {
        let layer = self.item_to_rep.layer().ok_or(DdnetError::NoRepresentation(ReprKind::Item))?;
        Ok(sigmoid_matrix(&layer.pre_activation(item)))
    }

    /// σ(context · W + b) through the context representation layer.
    pub fn calc_context_repr(&self, context: &Matrix) -> Result<Matrix> {
        let layer = self.ctx_to_rep.layer().ok_or(DdnetError::NoRepresentation(ReprKind::Context))?;
        Ok(sigmoid_matrix(&layer.pre_activation(context)))
    }

    /// Hidden-layer activations. A missing input is replaced by zeros with
    /// the other input's batch size (one row if both are missing).
    pub fn calc_hidden(&self, item: Option<&Matrix>, context: Option<&Matrix>) -> Matrix {
        let (_, _, _, hidden) = self.hidden_pass(item, context);
        hidden
    }

    /// Attribute probabilities, one row per (item, context) row pair.
    pub fn forward(&self, item: &Matrix, context: &Matrix) -> Matrix {
        self.forward_cached(item, context).output
    }

    pub fn forward_cached(&self, item: &Matrix, context: &Matrix) -> ForwardCache {
        let (item, context, rep, hidden) = self.hidden_pass(Some(item), Some(context));
        let output = sigmoid_matrix(&self.hidden_to_attr.pre_activation(&hidden));
        ForwardCache { item, context, rep, hidden, output }
    }

    /// Returns the (item, context) inputs actually used, the squashed
    /// representation, and the hidden activations.
    fn hidden_pass(&self, item: Option<&Matrix>, context: Option<&Matrix>) -> (Matrix, Matrix, Matrix, Matrix) {
        let batch = item.or(context).map_or(1, |m| m.rows);
        let item = item.cloned().unwrap_or_else(|| Matrix::zeros(batch, self.n_items));
        let context = context.cloned().unwrap_or_else(|| Matrix::zeros(batch, self.n_contexts));

        let irep = self.item_to_rep.pre_activation(&item);
        let crep = self.ctx_to_rep.pre_activation(&context);

        let rep = if self.config.merged_repr { irep + crep } else { irep.hcat(&crep) };
        let rep = sigmoid_matrix(&rep);
        let hidden = sigmoid_matrix(&self.rep_to_hidden.pre_activation(&rep));
        (item, context, rep, hidden)
    }

    // -----------------------------------------------------------------------
    // Back-propagation
    // -----------------------------------------------------------------------

    /// Adds the gradients of the summed BCE loss for this batch to the
    /// gradient buffer.
    pub fn backward(&mut self, cache: &ForwardCache, targets: &Matrix) {
        let d_out = BceLoss::logit_delta(&cache.output, targets);
        let attr_grads = self.hidden_to_attr.compute_gradients(&d_out, &cache.hidden);

        let d_hidden = sigmoid_backward(&self.hidden_to_attr.backpropagate(&d_out), &cache.hidden);
        let hidden_grads = self.rep_to_hidden.compute_gradients(&d_hidden, &cache.rep);

        let d_rep = sigmoid_backward(&self.rep_to_hidden.backpropagate(&d_hidden), &cache.rep);
        let (d_item, d_ctx) = if self.config.merged_repr {
            (d_rep.clone(), d_rep)
        } else {
            d_rep.split_cols(self.item_repr_size)
        };
        let item_grads = self.item_to_rep.layer().map(|l| l.compute_gradients(&d_item, &cache.item));
        let ctx_grads = self.ctx_to_rep.layer().map(|l| l.compute_gradients(&d_ctx, &cache.context));

        self.accumulate(ParamId::HiddenToAttrWeight, ParamId::AttrBias, attr_grads);
        self.accumulate(ParamId::RepToHiddenWeight, ParamId::HiddenBias, hidden_grads);
        if let Some(grads) = item_grads {
            self.accumulate(ParamId::ItemToRepWeight, ParamId::ItemRepBias, grads);
        }
        if let Some(grads) = ctx_grads {
            self.accumulate(ParamId::CtxToRepWeight, ParamId::CtxRepBias, grads);
        }
    }

    fn accumulate(&mut self, weight_id: ParamId, bias_id: ParamId, (w_grad, b_grad): (Matrix, Option<Matrix>)) {
        if let Some(acc) = self.grads.get_mut(&weight_id) {
            acc.add_scaled(1.0, &w_grad);
        }
        if let (Some(acc), Some(b_grad)) = (self.grads.get_mut(&bias_id), b_grad) {
            acc.add_scaled(1.0, &b_grad);
        }
    }

    pub fn zero_grad(&mut self) {
        for grad in self.grads.values_mut() {
            grad.fill(0.0);
        }
    }

    pub fn grad(&self, id: ParamId) -> Option<&Matrix> {
        self.grads.get(&id)
    }

    // -----------------------------------------------------------------------
    // Parameter access and checkpoints
    // -----------------------------------------------------------------------

    pub fn param(&self, id: ParamId) -> Option<&Matrix> {
        let (layer, is_bias) = match id {
            ParamId::ItemToRepWeight | ParamId::ItemRepBias => (self.item_to_rep.layer()?, id.is_bias()),
            ParamId::CtxToRepWeight | ParamId::CtxRepBias => (self.ctx_to_rep.layer()?, id.is_bias()),
            ParamId::RepToHiddenWeight | ParamId::HiddenBias => (&self.rep_to_hidden, id.is_bias()),
            ParamId::HiddenToAttrWeight | ParamId::AttrBias => (&self.hidden_to_attr, id.is_bias()),
        };
        match (is_bias, &layer.bias) {
            (false, _) => Some(&layer.weights),
            (true, Bias::Trainable(b)) => Some(b),
            (true, Bias::Fixed(_)) => None,
        }
    }

    /// Trainable parameters in declaration order.
    pub fn named_params(&self) -> Vec<(ParamId, &Matrix)> {
        ParamId::ALL
            .iter()
            .filter_map(|&id| self.param(id).map(|p| (id, p)))
            .collect()
    }

    /// Trainable parameters by display name, e.g. `"rep_to_hidden.weight"`.
    pub fn named_parameters(&self) -> Vec<(&'static str, &Matrix)> {
        self.named_params().into_iter().map(|(id, p)| (id.name(), p)).collect()
    }

    /// Every trainable parameter paired with its accumulated gradient.
    pub(crate) fn params_and_grads_mut(&mut self) -> Vec<(ParamId, &mut Matrix, &Matrix)> {
        let DisjointDomainNet { item_to_rep, ctx_to_rep, rep_to_hidden, hidden_to_attr, grads, .. } = self;
        let grads: &ParamMap = grads;
        collect_params_mut(item_to_rep, ctx_to_rep, rep_to_hidden, hidden_to_attr)
            .into_iter()
            .map(move |(id, param)| (id, param, &grads[&id]))
            .collect()
    }

    /// Copies every trainable parameter into an immutable checkpoint.
    pub fn state(&self) -> NetworkState {
        NetworkState {
            params: self.named_params().into_iter().map(|(id, p)| (id, p.clone())).collect(),
        }
    }

    /// Overwrites every trainable parameter from a checkpoint. The checkpoint
    /// must come from a network with the same architecture; nothing is
    /// written unless every entry matches.
    pub fn load_state(&mut self, state: &NetworkState) -> Result<()> {
        for (id, param) in self.named_params() {
            let saved = state.get(id).ok_or_else(|| {
                DdnetError::InvalidConfig(format!("checkpoint has no '{}'", id.name()))
            })?;
            check_shape(saved, param.shape())?;
        }
        let DisjointDomainNet { item_to_rep, ctx_to_rep, rep_to_hidden, hidden_to_attr, .. } = self;
        for (id, param) in collect_params_mut(item_to_rep, ctx_to_rep, rep_to_hidden, hidden_to_attr) {
            if let Some(saved) = state.get(id) {
                param.clone_from(saved);
            }
        }
        Ok(())
    }

    /// Writes the current parameters to a JSON file.
    pub fn save_state_json(&self, path: &str) -> Result<()> {
        self.state().save_json(path)
    }

    /// Restores parameters from a JSON file written by `save_state_json`.
    pub fn load_state_json(&mut self, path: &str) -> Result<()> {
        let state = NetworkState::load_json(path)?;
        self.load_state(&state)
    }
}

fn check_shape(m: &Matrix, expected: (usize, usize)) -> Result<()> {
    if m.shape() != expected {
        return Err(DdnetError::ShapeMismatch { expected, actual: m.shape() });
    }
    Ok(())
}

fn layer_params_mut(layer: &mut Layer, weight_id: ParamId, bias_id: ParamId) -> Vec<(ParamId, &mut Matrix)> {
    let mut params = vec![(weight_id, &mut layer.weights)];
    if let Some(bias) = layer.bias.trainable_mut() {
        params.push((bias_id, bias));
    }
    params
}

fn collect_params_mut<'a>(
    item_to_rep: &'a mut Projection,
    ctx_to_rep: &'a mut Projection,
    rep_to_hidden: &'a mut Layer,
    hidden_to_attr: &'a mut Layer,
) -> Vec<(ParamId, &'a mut Matrix)> {
    let mut params = Vec::new();
    if let Some(layer) = item_to_rep.layer_mut() {
        params.extend(layer_params_mut(layer, ParamId::ItemToRepWeight, ParamId::ItemRepBias));
    }
    if let Some(layer) = ctx_to_rep.layer_mut() {
        params.extend(layer_params_mut(layer, ParamId::CtxToRepWeight, ParamId::CtxRepBias));
    }
    params.extend(layer_params_mut(rep_to_hidden, ParamId::RepToHiddenWeight, ParamId::HiddenBias));
    params.extend(layer_params_mut(hidden_to_attr, ParamId::HiddenToAttrWeight, ParamId::AttrBias));
    params
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_config() -> NetConfig {
        NetConfig {
            attrs_per_context: 30,
            ..NetConfig::default()
        }
        .with_domains(2, 2)
        .with_seed(5)
        .with_repr_units(6, 4)
        .with_hidden_units(8)
    }

    #[test]
    fn sizes_follow_configuration() {
        let net = DisjointDomainNet::new(small_config()).unwrap();
        assert_eq!(net.n_items, 16);
        assert_eq!(net.n_contexts, 4);
        assert_eq!(net.n_attributes, 120);
        assert_eq!(net.n_inputs, net.n_items * net.n_contexts);
        assert_eq!(net.x_item.rows, net.n_inputs);
        assert_eq!(net.y.rows, net.n_inputs);
        assert_eq!(net.repr_size, 10);
    }

    #[test]
    fn skipped_and_merged_representation_sizes() {
        let skipped = DisjointDomainNet::new(NetConfig { use_item_repr: false, ..small_config() }).unwrap();
        assert_eq!(skipped.repr_size, 16 + 4);
        assert!(skipped.param(ParamId::ItemToRepWeight).is_none());
        assert_eq!(skipped.rep_to_hidden.input_size(), 20);

        let merged = DisjointDomainNet::new(NetConfig { merged_repr: true, ..small_config() }).unwrap();
        assert_eq!(merged.repr_size, 10);
        assert_eq!(merged.item_repr_size, 10);
        assert_eq!(merged.ctx_repr_size, 10);
        assert_eq!(merged.param(ParamId::CtxToRepWeight).unwrap().shape(), (4, 10));
    }

    #[test]
    fn merge_with_skipped_layer_is_rejected() {
        let cfg = NetConfig { merged_repr: true, use_ctx_repr: false, ..small_config() };
        assert!(matches!(DisjointDomainNet::new(cfg), Err(DdnetError::MergeWithoutRepr)));
    }

    #[test]
    fn disabled_representation_cannot_be_calculated() {
        let net = DisjointDomainNet::new(NetConfig { use_ctx_repr: false, ..small_config() }).unwrap();
        assert!(net.calc_item_repr(&net.items).is_ok());
        assert!(matches!(
            net.calc_context_repr(&net.contexts),
            Err(DdnetError::NoRepresentation(ReprKind::Context))
        ));
    }

    #[test]
    fn forward_is_bounded_and_batched() {
        let net = DisjointDomainNet::new(NetConfig { param_init_scale: 2.0, ..small_config() }).unwrap();
        let out = net.forward(&net.x_item, &net.x_context);
        assert_eq!(out.shape(), (net.n_inputs, net.n_attributes));
        assert!(out.iter().all(|p| (0.0..=1.0).contains(&p)));
    }

    #[test]
    fn small_init_gives_near_uniform_outputs() {
        let net = DisjointDomainNet::new(small_config()).unwrap();
        let out = net.forward(&net.x_item, &net.x_context);
        assert!(out.iter().all(|p| (p - 0.5).abs() < 0.05));
    }

    #[test]
    fn missing_inputs_become_zero_rows() {
        let net = DisjointDomainNet::new(small_config()).unwrap();
        let items_only = net.calc_hidden(Some(&net.items), None);
        assert_eq!(items_only.shape(), (net.n_items, net.hidden_size));

        let zero_ctx = Matrix::zeros(net.n_items, net.n_contexts);
        let explicit = net.calc_hidden(Some(&net.items), Some(&zero_ctx));
        assert_eq!(items_only, explicit);

        assert_eq!(net.calc_hidden(None, None).shape(), (1, net.hidden_size));
        assert_eq!(net.calc_hidden(None, Some(&net.contexts)).rows, net.n_contexts);
    }

    #[test]
    fn fixed_biases_are_not_parameters() {
        let cfg = NetConfig { fix_biases: true, fixed_bias: -2.0, ..small_config() };
        let net = DisjointDomainNet::new(cfg).unwrap();
        let names: Vec<&str> = net.named_parameters().into_iter().map(|(n, _)| n).collect();
        assert_eq!(
            names,
            vec!["item_to_rep.weight", "ctx_to_rep.weight", "rep_to_hidden.weight", "hidden_to_attr.weight"]
        );
        assert!(net.hidden_to_attr.bias.values().iter().all(|b| b == -2.0));
    }

    #[test]
    fn uniform_init_respects_scale() {
        let net = DisjointDomainNet::new(small_config().with_init(InitType::Uniform, 0.05)).unwrap();
        for (_, p) in net.named_params() {
            assert!(p.iter().all(|x| x.abs() <= 0.05));
        }
    }

    #[test]
    fn state_round_trip_restores_parameters() {
        let mut net = DisjointDomainNet::new(small_config()).unwrap();
        let saved = net.state();
        for (_, param, _) in net.params_and_grads_mut() {
            param.fill(1.0);
        }
        assert_ne!(net.state(), saved);
        net.load_state(&saved).unwrap();
        assert_eq!(net.state(), saved);
    }

    #[test]
    fn backprop_matches_finite_differences() {
        for merged in [false, true] {
            let cfg = NetConfig { merged_repr: merged, param_init_scale: 0.5, ..small_config() };
            let mut net = DisjointDomainNet::new(cfg).unwrap();
            let rows = [0, 7, 33, 62];
            let xi = net.x_item.select_rows(&rows);
            let xc = net.x_context.select_rows(&rows);
            let y = net.y.select_rows(&rows);

            net.zero_grad();
            let cache = net.forward_cached(&xi, &xc);
            net.backward(&cache, &y);

            let h = 1e-6;
            for id in [ParamId::ItemToRepWeight, ParamId::CtxRepBias, ParamId::RepToHiddenWeight, ParamId::AttrBias] {
                let (r, c) = (0, 1);
                let analytic = net.grad(id).unwrap().data[r][c];

                let mut plus = net.state();
                plus.params.get_mut(&id).unwrap().data[r][c] += h;
                let mut minus = net.state();
                minus.params.get_mut(&id).unwrap().data[r][c] -= h;

                let original = net.state();
                net.load_state(&plus).unwrap();
                let l_plus = BceLoss::loss_sum(&net.forward(&xi, &xc), &y);
                net.load_state(&minus).unwrap();
                let l_minus = BceLoss::loss_sum(&net.forward(&xi, &xc), &y);
                net.load_state(&original).unwrap();

                let numeric = (l_plus - l_minus) / (2.0 * h);
                let tol = 1e-5 * (1.0 + analytic.abs());
                assert!((numeric - analytic).abs() < tol, "{id:?} merged={merged}: {numeric} vs {analytic}");
            }
        }
    }
}
