//! End-to-end tests for ddnet.
//!
//! These drive full training runs through the public API: partitions,
//! reports, snapshots, generalization probes and the JSON round trips.

use ddnet::{
    snapshot::SnapScale,
    train::train_config::{HoldoutMode, TrainConfig},
    DdnetError, DisjointDomainNet, NetConfig, RunConfig, Sgd, TrainingRun,
};

/// Small two-domain network with a fixed seed.
fn small_net(n_domains: usize, ctx_per_domain: usize, seed: u64) -> DisjointDomainNet {
    let cfg = NetConfig::default()
        .with_domains(n_domains, ctx_per_domain)
        .with_seed(seed)
        .with_repr_units(8, 8)
        .with_hidden_units(16);
    DisjointDomainNet::new(cfg).unwrap()
}

#[test]
fn ten_epoch_single_batch_run() {
    let mut net = small_net(2, 2, 42);
    let cfg = TrainConfig::new(0.01, 10, -1, 5);
    let run = net.do_training(&cfg).unwrap();

    assert_eq!(run.reports.loss.len(), 2);
    assert_eq!(run.reports.epochs, vec![0, 5]);
    let first = run.reports.loss[0];
    assert!(first.is_finite() && first > 0.0);
    assert!(run.reports.weighted_acc.iter().all(|w| (0.0..=1.0).contains(w)));
    assert!(run.reports.etg_item.is_none());
    assert!(run.reports.test_weighted_acc.is_none());
}

#[test]
fn same_seed_same_run() {
    let cfg = TrainConfig::new(0.05, 6, 8, 2).with_holdout(HoldoutMode::Context).with_probe(1, 0.8, 4);
    let a = small_net(2, 2, 7).do_training(&cfg).unwrap();
    let b = small_net(2, 2, 7).do_training(&cfg).unwrap();
    assert_eq!(a, b);
}

#[test]
fn combo_testing_holds_out_one_example_per_domain() {
    let mut net = small_net(3, 3, 5);
    let combo = net.prepare_combo_testing().unwrap();

    assert_eq!(combo.test_x_inds.len(), 3);
    for (domain, &r) in combo.test_x_inds.iter().enumerate() {
        let item = net.example_item(r);
        assert_eq!(item / net.items_per_domain, domain);
        assert_eq!(net.example_context(r) / net.ctx_per_domain, domain);
    }
    assert!(combo.test_x_inds.iter().all(|r| !combo.train_x_inds.contains(r)));
}

#[test]
fn combo_run_reports_test_accuracy() {
    let mut net = small_net(2, 2, 9);
    let cfg = TrainConfig::new(0.05, 4, -1, 2).with_combo_testing(true);
    let run = net.do_training(&cfg).unwrap();

    let test_wacc = run.reports.test_weighted_acc.unwrap();
    assert_eq!(test_wacc.len(), 2);
    assert!(test_wacc.iter().all(|w| (0.0..=1.0).contains(w)));
    assert_eq!(run.reports.test_accuracy.unwrap().len(), 2);
}

#[test]
fn holdout_and_combo_together_fail_before_training() {
    let mut net = small_net(2, 2, 1);
    let before = net.state();
    let cfg = TrainConfig::new(0.05, 4, -1, 2)
        .with_holdout(HoldoutMode::Item)
        .with_combo_testing(true);

    assert!(matches!(net.do_training(&cfg), Err(DdnetError::HoldoutAndCombo)));
    assert_eq!(net.state(), before);
}

#[test]
fn domain_holdout_probe_runs() {
    let mut net = small_net(2, 2, 3);
    let cfg = TrainConfig::new(0.05, 3, -1, 1)
        .with_holdout(HoldoutMode::Domain)
        .with_probe(2, 0.99, 2)
        .with_snapshots(1, SnapScale::Lin);
    let run = net.do_training(&cfg).unwrap();

    assert_eq!(run.reports.etg_domain.as_ref().unwrap().len(), 2);
    // Last-domain items are never snapshotted.
    for item in 8..16 {
        assert!(!run.snaps.item_hidden.is_set(0, item));
    }
    assert!(run.snaps.item_hidden.is_set(2, 0));
}

#[test]
fn last_epoch_success_and_miss_store_different_counts() {
    let base = TrainConfig::new(0.05, 1, -1, 1).with_holdout(HoldoutMode::Item);
    let hit = small_net(2, 2, 6).do_training(&base.clone().with_probe(1, 0.0, 1)).unwrap();
    let miss = small_net(2, 2, 6).do_training(&base.with_probe(1, 1.1, 1)).unwrap();

    assert_eq!(hit.reports.etg_item, Some(vec![0]));
    assert_eq!(miss.reports.etg_item, Some(vec![1]));
}

#[test]
fn generalize_test_leaves_parameters_untouched() {
    let mut net = small_net(2, 2, 8);
    let mut opt = Sgd::new(0.1);
    let split = net.prepare_holdout(true, true);

    let before = net.state();
    let result = net
        .generalize_test(16, &mut opt, &split.included_inds_item(), &split.test_x_item_inds, 3, 0.99)
        .unwrap();

    assert!(result.epochs <= 3);
    assert_eq!(net.state(), before);
}

#[test]
fn snapshots_hold_sigmoid_outputs_or_nothing() {
    let mut net = small_net(2, 2, 4);
    let cfg = TrainConfig::new(0.05, 20, 16, 10).with_snapshots(3, SnapScale::Log);
    let run = net.do_training(&cfg).unwrap();

    assert_eq!(run.snaps.epochs.first(), Some(&0));
    assert_eq!(run.snaps.epochs.last(), Some(&19));
    let tensors = [
        run.snaps.item.as_ref().unwrap(),
        run.snaps.context.as_ref().unwrap(),
        &run.snaps.item_hidden,
        &run.snaps.context_hidden,
    ];
    for tensor in tensors {
        assert_eq!(tensor.n_snaps, run.snaps.epochs.len());
        assert!(tensor.data.iter().all(|v| v.map_or(false, |x| (0.0..=1.0).contains(&x))));
    }
}

#[test]
fn run_config_and_results_round_trip_through_files() {
    let dir = tempfile::tempdir().unwrap();
    let cfg_path = dir.path().join("config.json");
    let run_path = dir.path().join("run.json");

    let mut config = RunConfig::default();
    config.net = config.net.with_domains(2, 2).with_seed(12).with_hidden_units(8);
    config.train = TrainConfig::new(0.05, 4, -1, 2).with_holdout(HoldoutMode::Full).with_probe(1, 0.9, 2);
    config.save_json(cfg_path.to_str().unwrap()).unwrap();

    let loaded = RunConfig::load_json(cfg_path.to_str().unwrap()).unwrap();
    assert_eq!(loaded, config);

    let mut net = DisjointDomainNet::new(loaded.net).unwrap();
    let run = net.do_training(&loaded.train).unwrap();
    run.save_json(run_path.to_str().unwrap()).unwrap();

    let restored = TrainingRun::load_json(run_path.to_str().unwrap()).unwrap();
    assert_eq!(restored.reports, run.reports);
    assert_eq!(restored.snaps.epochs, run.snaps.epochs);
}

#[test]
fn network_state_round_trips_through_a_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("state.json");
    let path = path.to_str().unwrap();

    let mut net = small_net(2, 2, 21);
    net.save_state_json(path).unwrap();
    let saved = net.state();

    let all: Vec<usize> = (0..net.n_inputs).collect();
    net.train_epoch(&all, -1, &mut Sgd::new(0.5));
    assert_ne!(net.state(), saved);

    net.load_state_json(path).unwrap();
    assert_eq!(net.state(), saved);
}
