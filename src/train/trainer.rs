use serde::{Serialize, Deserialize};
use tracing::info;

use crate::data::sampling::choose_k;
use crate::error::Result;
use crate::network::network::DisjointDomainNet;
use crate::optim::scheduler::LrScheduler;
use crate::optim::sgd::Sgd;
use crate::snapshot::recorder::{ParamSnapshots, Snapshots};
use crate::train::report::{ProbeKind, Reports};
use crate::train::train_config::{HoldoutMode, TrainConfig};

/// Everything one `do_training` run produces.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingRun {
    pub snaps: Snapshots,
    pub reports: Reports,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub params: Option<ParamSnapshots>,
}

impl TrainingRun {
    pub fn save_json(&self, path: &str) -> Result<()> {
        let file = std::fs::File::create(path)?;
        let writer = std::io::BufWriter::new(file);
        serde_json::to_writer_pretty(writer, self)?;
        Ok(())
    }

    pub fn load_json(path: &str) -> Result<TrainingRun> {
        let file = std::fs::File::open(path)?;
        let reader = std::io::BufReader::new(file);
        Ok(serde_json::from_reader(reader)?)
    }
}

/// One generalization probe: train on `included`, measure on `targets`.
struct Probe {
    kind: ProbeKind,
    included: Vec<usize>,
    targets: Vec<usize>,
}

/// Which examples and entities a run trains on, and what it tests.
struct Partition {
    train_item_inds: Vec<usize>,
    train_ctx_inds: Vec<usize>,
    train_x_inds: Vec<usize>,
    probes: Vec<Probe>,
    combo_test_inds: Option<Vec<usize>>,
}

// ---------------------------------------------------------------------------
// Public entry points
// ---------------------------------------------------------------------------

impl DisjointDomainNet {
    /// Runs a full training session. Uses the scheduler named in
    /// `config.scheduler`, if any.
    pub fn do_training(&mut self, config: &TrainConfig) -> Result<TrainingRun> {
        let mut scheduler = config.scheduler.as_ref().map(|s| s.build());
        match scheduler.as_mut() {
            Some(s) => self.do_training_with(config, Some(&mut **s)),
            None => self.do_training_with(config, None),
        }
    }

    /// Runs a full training session, stepping `scheduler` once per epoch.
    ///
    /// Every epoch: record a snapshot if one is due, train on a fresh shuffle
    /// of the training examples, step the scheduler. On report epochs the
    /// means over the training examples are stored and logged, and every
    /// `reports_per_test`-th report also runs the active generalization
    /// probes. Combo tests are evaluated on every report.
    pub fn do_training_with(
        &mut self,
        config: &TrainConfig,
        mut scheduler: Option<&mut dyn LrScheduler>,
    ) -> Result<TrainingRun> {
        config.validate()?;

        let mut optimizer = Sgd::with_momentum(config.lr, config.momentum);
        let part = self.partition(config)?;
        let n_train = part.train_x_inds.len();

        let mut snaps = self.prepare_snapshots(config.snap_freq, config.snap_freq_scale, config.num_epochs);
        let mut params = config
            .param_snapshots
            .then(|| ParamSnapshots::prepare(self, snaps.n_snaps()));

        let probe_kinds: Vec<ProbeKind> = part.probes.iter().map(|p| p.kind).collect();
        let mut reports = Reports::allocate(
            config.n_reports(),
            config.report_freq,
            config.n_tests(),
            &probe_kinds,
            part.combo_test_inds.is_some(),
        );

        let epoch_digits = snaps.epoch_digits;
        let etg_digits = config.test_max_epochs.to_string().len() + 2;

        for epoch in 0..config.num_epochs {
            if let Some(k) = snaps.index_of(epoch) {
                snaps.record(k, self, &part.train_item_inds, &part.train_ctx_inds)?;
                if let Some(params) = params.as_mut() {
                    params.record(k, self);
                }
            }

            let order = choose_k(&mut self.rng, &part.train_x_inds, n_train);
            let stats = self.train_epoch(&order, config.batch_size, &mut optimizer);
            if let Some(scheduler) = scheduler.as_deref_mut() {
                scheduler.step(&mut optimizer);
            }

            if epoch % config.report_freq != 0 {
                continue;
            }
            let k_report = epoch / config.report_freq;

            let mean_loss = stats.mean_loss(n_train);
            let mean_wacc = stats.mean_wacc(n_train);
            reports.loss[k_report] = mean_loss;
            reports.accuracy[k_report] = stats.mean_acc(n_train);
            reports.weighted_acc[k_report] = mean_wacc;

            let mut line = format!(
                "Epoch {epoch:>epoch_digits$} end: loss = {mean_loss:7.3}, weighted acc = {mean_wacc:.3}"
            );

            if k_report % config.reports_per_test == 0 {
                let k_test = k_report / config.reports_per_test;
                for probe in &part.probes {
                    let etg = self.generalize_test(
                        config.batch_size,
                        &mut optimizer,
                        &probe.included,
                        &probe.targets,
                        config.test_max_epochs,
                        config.test_thresh,
                    )?;
                    line.push_str(&format!(", epochs for new {} {etg:>etg_digits$}", probe.kind));
                    if let Some(series) = reports.etg_mut(probe.kind) {
                        series[k_test] = etg.epochs;
                    }
                }
            }

            if let Some(test_inds) = &part.combo_test_inds {
                let (test_acc, test_wacc) = self.evaluate(test_inds);
                line.push_str(&format!(", test weighted acc = {test_wacc:.3}"));
                if let (Some(acc), Some(wacc)) = (reports.test_accuracy.as_mut(), reports.test_weighted_acc.as_mut()) {
                    acc[k_report] = test_acc;
                    wacc[k_report] = test_wacc;
                }
            }

            info!("{line}");
        }

        Ok(TrainingRun { snaps, reports, params })
    }

    // -----------------------------------------------------------------------
    // Private helpers
    // -----------------------------------------------------------------------

    fn partition(&mut self, config: &TrainConfig) -> Result<Partition> {
        let mut part = Partition {
            train_item_inds: (0..self.n_items).collect(),
            train_ctx_inds: (0..self.n_contexts).collect(),
            train_x_inds: (0..self.n_inputs).collect(),
            probes: Vec::new(),
            combo_test_inds: None,
        };

        match config.holdout_testing {
            HoldoutMode::None if config.do_combo_testing => {
                let combo = self.prepare_combo_testing()?;
                part.train_x_inds = combo.train_x_inds;
                part.combo_test_inds = Some(combo.test_x_inds);
            }
            HoldoutMode::None => {}
            HoldoutMode::Domain => {
                let ho = self.prepare_domain_holdout()?;
                part.train_item_inds = ho.train_item_inds;
                part.train_ctx_inds = ho.train_ctx_inds;
                part.train_x_inds = ho.train_x_inds;
                part.probes.push(Probe {
                    kind: ProbeKind::Domain,
                    included: (0..self.n_inputs).collect(),
                    targets: ho.test_x_inds,
                });
            }
            mode => {
                let split = self.prepare_holdout(mode.holds_out_item(), mode.holds_out_context());
                if mode.holds_out_item() {
                    part.probes.push(Probe {
                        kind: ProbeKind::Item,
                        included: split.included_inds_item(),
                        targets: split.test_x_item_inds.clone(),
                    });
                }
                if mode.holds_out_context() {
                    part.probes.push(Probe {
                        kind: ProbeKind::Context,
                        included: split.included_inds_ctx(),
                        targets: split.test_x_ctx_inds.clone(),
                    });
                }
                part.train_item_inds = split.train_item_inds;
                part.train_ctx_inds = split.train_ctx_inds;
                part.train_x_inds = split.train_x_inds;
            }
        }

        Ok(part)
    }
}
