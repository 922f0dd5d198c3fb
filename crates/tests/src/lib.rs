//! # Integration Tests
//!
//! Integration and end-to-end tests.
//!
//! Covers:
//! - Contract snapshot tests
//! - Simulated e2e tests (no hardware required)
//! - Dispatcher fan-out

#[cfg(test)]
mod contract_tests {
    #[test]
    fn test_contracts_compile() {
        let _ = contracts::ConfigVersion::V1;
    }
}

#[cfg(test)]
mod e2e_tests {
    use std::collections::HashMap;
    use std::time::Duration;

    use contracts::{
        CalibrationConfig, ConfigVersion, CorrelatedRecord, CorrelationConfig, CorrelationQuality,
        DetectionConfig, DeviceConfig, DeviceRole, IngestionConfig, RangeBlueprint,
        ReconnectConfig, SessionConfig, SinkConfig, SinkType, TimerEventKind,
    };
    use correlation::CorrelationEngine;
    use device_gateway::{build_sources, SimScenario, SimTimerConfig, SourceMode};
    use dispatcher::create_dispatcher;
    use ingestion::{BackpressureConfig, IngestionPipeline};
    use tokio::sync::mpsc;

    fn device(id: &str, addr: &str, role: DeviceRole, target: Option<&str>) -> DeviceConfig {
        DeviceConfig {
            id: id.to_string(),
            addr: addr.to_string(),
            role,
            target: target.map(str::to_string),
            sample_rate_hz: 50.0,
        }
    }

    fn blueprint(devices: Vec<DeviceConfig>, correlation: CorrelationConfig) -> RangeBlueprint {
        RangeBlueprint {
            version: ConfigVersion::V1,
            session: SessionConfig {
                name: "e2e".into(),
                description: None,
            },
            devices,
            // Short calibration so detection goes live quickly
            calibration: CalibrationConfig {
                sample_target: 10,
                ..Default::default()
            },
            detection: DetectionConfig::default(),
            correlation,
            reconnect: ReconnectConfig::default(),
            ingestion: IngestionConfig::default(),
            sinks: vec![],
        }
    }

    /// End-to-end: SimTimer + SimSensors -> Ingestion -> CorrelationEngine -> Dispatcher
    ///
    /// A two-shot string where every shot hits target A; target B stays
    /// silent. Expects two control records (start/stop) and two paired
    /// shot records.
    #[tokio::test]
    async fn test_e2e_sim_pipeline() {
        let correlation = CorrelationConfig {
            window_s: 1.0,
            excellent_s: 0.35,
            good_s: 0.55,
            buffer_size: 64,
        };
        let blueprint = blueprint(
            vec![
                device("timer1", "AA:BB:CC:00:00:01", DeviceRole::Timer, None),
                device("plate_a", "AA:BB:CC:00:00:02", DeviceRole::Sensor, Some("A")),
                device("plate_b", "AA:BB:CC:00:00:03", DeviceRole::Sensor, Some("B")),
            ],
            correlation,
        );

        let shot_times = vec![0.8, 1.3];
        let mut impacts = HashMap::new();
        impacts.insert(
            "A".to_string(),
            shot_times.iter().map(|t| t + 0.2).collect::<Vec<_>>(),
        );

        let scenario = SimScenario {
            timer: SimTimerConfig {
                start_at_s: 0.3,
                shot_times,
                stop_delay_s: 0.5,
                string_number: 1,
            },
            impacts,
        };

        // The session clock starts inside build_sources; this anchor is
        // close enough to drive advance ticks.
        let session_start = std::time::Instant::now();
        let devices = build_sources(&blueprint, &SourceMode::Sim(scenario)).unwrap();

        let mut ingestion = IngestionPipeline::with_config(
            BackpressureConfig::default(),
            blueprint.calibration,
            blueprint.detection,
            blueprint.reconnect,
        );
        for (config, source) in devices.sources {
            ingestion.register_device_source(&config, source, None);
        }

        let mut engine = CorrelationEngine::new(correlation);

        // Dispatcher with a log sink on the far end
        let (record_tx, record_rx) = mpsc::channel::<CorrelatedRecord>(100);
        let sink_configs = vec![SinkConfig {
            name: "test_log".to_string(),
            sink_type: SinkType::Log,
            queue_capacity: 50,
            params: HashMap::new(),
        }];
        let dispatcher = create_dispatcher(sink_configs, record_rx).await.unwrap();
        let dispatcher_handle = dispatcher.spawn();

        ingestion.start_all();
        let event_rx = ingestion.take_receiver().unwrap();

        // Shots only finalize once the engine clock passes the window,
        // so periodic advance ticks stand in for the orchestrator.
        let collect = async {
            let mut records: Vec<CorrelatedRecord> = Vec::new();
            let mut tick = tokio::time::interval(Duration::from_millis(50));
            while records.len() < 4 {
                let emitted = tokio::select! {
                    event = event_rx.recv() => {
                        let Ok(event) = event else { break };
                        engine.push(event)
                    }
                    _ = tick.tick() => {
                        engine.advance(session_start.elapsed().as_secs_f64())
                    }
                };
                for record in emitted {
                    record_tx.send(record.clone()).await.unwrap();
                    records.push(record);
                }
            }
            records
        };

        let records = tokio::time::timeout(Duration::from_secs(10), collect)
            .await
            .expect("pipeline timed out");

        ingestion.stop_all();
        drop(record_tx);
        let _ = tokio::time::timeout(Duration::from_secs(2), dispatcher_handle).await;

        assert_eq!(records.len(), 4, "records: {records:?}");

        let controls: Vec<_> = records
            .iter()
            .filter(|r| r.quality.is_none())
            .collect();
        assert_eq!(controls.len(), 2);
        assert!(controls
            .iter()
            .any(|r| r.timer.kind == TimerEventKind::Start));
        assert!(controls
            .iter()
            .any(|r| r.timer.kind == TimerEventKind::Stop));

        let shots: Vec<_> = records
            .iter()
            .filter(|r| r.timer.kind == TimerEventKind::Shot)
            .collect();
        assert_eq!(shots.len(), 2);

        for shot in shots {
            let impact = shot.impact.as_ref().expect("shot should pair");
            assert_eq!(impact.target, "A");
            assert!(matches!(
                shot.quality,
                Some(CorrelationQuality::Excellent) | Some(CorrelationQuality::Good)
            ));
            let offset = shot.offset_s.unwrap();
            assert!(offset > 0.0 && offset < 0.55, "offset {offset}");
        }
    }

    /// A shot with no sensor activity scores as a miss
    #[tokio::test]
    async fn test_e2e_silent_target_is_a_miss() {
        let correlation = CorrelationConfig {
            window_s: 0.6,
            excellent_s: 0.2,
            good_s: 0.4,
            buffer_size: 64,
        };
        let blueprint = blueprint(
            vec![
                device("timer1", "AA:BB:CC:00:00:01", DeviceRole::Timer, None),
                device("plate_a", "AA:BB:CC:00:00:02", DeviceRole::Sensor, Some("A")),
            ],
            correlation,
        );

        // No impacts scripted anywhere
        let scenario = SimScenario {
            timer: SimTimerConfig {
                start_at_s: 0.2,
                shot_times: vec![0.5],
                stop_delay_s: 0.3,
                string_number: 1,
            },
            impacts: HashMap::new(),
        };

        let session_start = std::time::Instant::now();
        let devices = build_sources(&blueprint, &SourceMode::Sim(scenario)).unwrap();

        let mut ingestion = IngestionPipeline::with_config(
            BackpressureConfig::default(),
            blueprint.calibration,
            blueprint.detection,
            blueprint.reconnect,
        );
        for (config, source) in devices.sources {
            ingestion.register_device_source(&config, source, None);
        }

        let mut engine = CorrelationEngine::new(correlation);

        ingestion.start_all();
        let event_rx = ingestion.take_receiver().unwrap();

        let collect = async {
            let mut records: Vec<CorrelatedRecord> = Vec::new();
            let mut tick = tokio::time::interval(Duration::from_millis(50));
            while records.len() < 3 {
                let emitted = tokio::select! {
                    event = event_rx.recv() => {
                        let Ok(event) = event else { break };
                        engine.push(event)
                    }
                    _ = tick.tick() => {
                        engine.advance(session_start.elapsed().as_secs_f64())
                    }
                };
                records.extend(emitted);
            }
            records
        };

        let records = tokio::time::timeout(Duration::from_secs(10), collect)
            .await
            .expect("pipeline timed out");

        ingestion.stop_all();

        let shot = records
            .iter()
            .find(|r| r.timer.kind == TimerEventKind::Shot)
            .expect("shot record");
        assert!(shot.impact.is_none());
        assert_eq!(shot.quality, Some(CorrelationQuality::NoImpact));
        assert!(shot.offset_s.is_none());
    }

    /// Dispatcher fans records out to multiple sinks
    #[tokio::test]
    async fn test_dispatcher_multiple_sinks() {
        use contracts::{CorrelationMeta, TimerEvent};

        let (tx, rx) = mpsc::channel::<CorrelatedRecord>(10);

        let sink_configs = vec![
            SinkConfig {
                name: "log1".to_string(),
                sink_type: SinkType::Log,
                queue_capacity: 50,
                params: HashMap::new(),
            },
            SinkConfig {
                name: "log2".to_string(),
                sink_type: SinkType::Log,
                queue_capacity: 50,
                params: HashMap::new(),
            },
        ];

        let dispatcher = create_dispatcher(sink_configs, rx).await.unwrap();

        // Check metrics before running
        let metrics = dispatcher.metrics();
        assert_eq!(metrics.len(), 2);

        let handle = dispatcher.spawn();

        for i in 0..5u64 {
            let record = CorrelatedRecord {
                record_id: i + 1,
                timer: TimerEvent {
                    kind: TimerEventKind::Shot,
                    timestamp: i as f64 * 0.5,
                    sequence: i as u32 + 1,
                    split_s: 0.5,
                    cumulative_s: i as f64 * 0.5,
                    string_number: 1,
                },
                impact: None,
                offset_s: None,
                quality: Some(CorrelationQuality::NoImpact),
                meta: CorrelationMeta {
                    window_s: 2.0,
                    candidates_considered: 0,
                    pending_depth: 0,
                    dropped_count: 0,
                    out_of_order_count: 0,
                },
            };
            tx.send(record).await.unwrap();
        }

        drop(tx);
        let _ = tokio::time::timeout(Duration::from_secs(2), handle).await;
    }
}
