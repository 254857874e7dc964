//! Integration tests for the full spin pipeline: determinism, the win cap,
//! hash round-tripping, and the synchronizer's step-completion contract.

use cascade_slot_core::cascade::CascadeProcessor;
use cascade_slot_core::config::SlotConfig;
use cascade_slot_core::grid::GridGenerator;
use cascade_slot_core::hash::{canonical_full_result, compute, HashScope};
use cascade_slot_core::orchestrator::{GameMode, SpinOrchestrator};
use cascade_slot_core::rng::SecureRng;
use cascade_slot_core::symbols::SymbolTable;
use cascade_slot_core::sync::{CascadeSynchronizer, DesyncType, SyncEvent, SyncPhase};
use cascade_slot_core::validator::CascadeValidator;

#[test]
fn same_seed_produces_identical_grid_and_cascade_sequence() {
    let _ = env_logger::try_init();
    let table = SymbolTable::standard();
    let config = SlotConfig::default();
    let rng = SecureRng::new();
    let gen = GridGenerator::new(config.grid, &table);
    let processor = CascadeProcessor::new(config.grid, &table, config.min_match.cluster, config.max_cascade_steps);

    let stream_a = rng.derive_stream("shared-seed", "grid");
    let grid_a = gen.generate(&stream_a, config.scatter_chance.base, config.scatter_chance.free_spins, false).unwrap();
    let run_a = processor.run(&rng, "shared-seed", grid_a.clone(), 1.0, false, (150.0, 200.0)).unwrap();

    let stream_b = rng.derive_stream("shared-seed", "grid");
    let grid_b = gen.generate(&stream_b, config.scatter_chance.base, config.scatter_chance.free_spins, false).unwrap();
    let run_b = processor.run(&rng, "shared-seed", grid_b.clone(), 1.0, false, (150.0, 200.0)).unwrap();

    assert_eq!(grid_a, grid_b);
    assert_eq!(run_a.steps.len(), run_b.steps.len());
    for (a, b) in run_a.steps.iter().zip(run_b.steps.iter()) {
        assert_eq!(a.grid_after, b.grid_after);
    }
}

#[test]
fn repeated_spins_never_exceed_the_win_cap() {
    let _ = env_logger::try_init();
    let config = SlotConfig::default();
    let orchestrator = SpinOrchestrator::new(config.clone());
    for _ in 0..300 {
        let result = orchestrator.process_spin(2.0, GameMode::Base).unwrap();
        assert!(result.total_win <= 2.0 * config.max_win_multiplier + 0.01);
    }
}

#[test]
fn validation_hash_is_reproducible_from_the_same_canonical_form_and_salt() {
    let orchestrator = SpinOrchestrator::new(SlotConfig::default());
    let result = orchestrator.process_spin(1.0, GameMode::Base).unwrap();
    let recomputed = compute(
        &canonical_full_result(result.bet, &result.cascade_steps, result.total_win),
        &result.hash_salt,
        HashScope::FullResult,
    );
    assert_eq!(recomputed, result.validation_hash);
}

#[test]
fn full_pipeline_result_always_passes_structural_and_payout_validation() {
    let config = SlotConfig::default();
    let table = SymbolTable::standard();
    let orchestrator = SpinOrchestrator::new(config.clone());
    let validator = CascadeValidator::new(&config, &table);
    for _ in 0..50 {
        let result = orchestrator.process_spin(1.0, GameMode::Base).unwrap();
        let outcome = validator.validate(&result);
        assert!(outcome.is_valid(), "{:?}", outcome.issues);
    }
}

#[test]
fn synchronizer_streams_to_completion_without_gaps() {
    let sync = CascadeSynchronizer::new(Default::default());
    sync.init("sync-int".into(), 3, "grid-hash-0".into());
    sync.handle(SyncEvent::InitAck {
        sync_id: "sync-int".into(),
        grid_hash: "grid-hash-0".into(),
    })
    .unwrap();
    for step in 0..3u32 {
        let responses = sync
            .handle(SyncEvent::StepAck {
                sync_id: "sync-int".into(),
                step_index: step,
                grid_hash: format!("grid-hash-{}", step + 1),
            })
            .unwrap();
        if step == 2 {
            assert!(matches!(responses.last(), Some(SyncEvent::StreamComplete { .. })));
        }
    }
    assert_eq!(sync.get("sync-int").unwrap().phase, SyncPhase::Completed);
}

#[test]
fn synchronizer_recovers_from_a_single_reported_desync() {
    let sync = CascadeSynchronizer::new(Default::default());
    sync.init("sync-recover".into(), 5, "grid-hash-0".into());
    let responses = sync
        .handle(SyncEvent::DesyncReport {
            sync_id: "sync-recover".into(),
            step_index: 2,
            desync_type: DesyncType::Grid,
        })
        .unwrap();
    assert!(!responses.is_empty());
    assert_eq!(sync.get("sync-recover").unwrap().phase, SyncPhase::Recovering);

    sync.handle(SyncEvent::RecoveryComplete {
        sync_id: "sync-recover".into(),
    })
    .unwrap();
    assert_eq!(sync.get("sync-recover").unwrap().phase, SyncPhase::StreamingSteps);
}

#[test]
fn free_spins_mode_accumulates_multiplier_additively_across_spins() {
    let config = SlotConfig::default();
    let orchestrator = SpinOrchestrator::new(config.clone());
    let session_id = "fs-int-1".to_string();
    orchestrator.free_spins_engine().trigger(session_id.clone(), 1.0, 4).unwrap();

    let mut last_multiplier = 1.0;
    for _ in 0..5 {
        if !orchestrator.free_spins_engine().is_active(&session_id) {
            break;
        }
        let result = orchestrator
            .process_spin(1.0, GameMode::FreeSpins { session_id: session_id.clone() })
            .unwrap();
        assert!(result.accumulated_multiplier >= last_multiplier);
        last_multiplier = result.accumulated_multiplier;
    }
}
