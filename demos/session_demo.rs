//! Demonstration of a two-session analysis for one subject.
//!
//! This example shows how to:
//! 1. Build session input from per-modality score vectors
//! 2. Attach a transcript
//! 3. Analyze against a signature store
//! 4. Read spikes, incongruence markers, congruence events and repetition
//!
//! Run with: cargo run --example session_demo

use session_affect::{
    transparency::create_shared_log, AnalysisConfig, Analyzer, MemorySignatureStore, RawSample,
    SessionInput, TranscriptSegment, OBSERVATION_DECLARATION,
};

/// A session where the words stay light while face and voice sink.
fn build_session(session_id: &str) -> SessionInput {
    let mut input = SessionInput::new(session_id, "demo-subject");
    input.duration_secs = Some(20.0);

    input.face = (0..=20)
        .step_by(2)
        .map(|t| {
            let sad = if (8..=14).contains(&t) { 0.7 } else { 0.1 };
            RawSample::new(t as f64, [("neutral", 1.0 - sad), ("sadness", sad)])
        })
        .collect();

    input.audio = (0..=20)
        .step_by(4)
        .map(|t| {
            let fear = if (8..=12).contains(&t) { 0.6 } else { 0.05 };
            RawSample::new(t as f64, [("neutral", 1.0 - fear), ("fear", fear)])
        })
        .collect();

    input.transcript = vec![
        TranscriptSegment::new(0.0, 6.0, "The week was okay, nothing special.").with_valence(0.1),
        TranscriptSegment::new(8.0, 14.0, "Honestly I'm doing great, really.").with_valence(0.7),
        TranscriptSegment::new(15.0, 20.0, "We can talk about something else.").with_valence(0.0),
    ];
    input
}

fn main() {
    println!("Session Affect - Analysis Demo");
    println!("==============================");
    println!();
    println!("{OBSERVATION_DECLARATION}");

    let log = create_shared_log();
    let analyzer = match Analyzer::new(AnalysisConfig::default()) {
        Ok(a) => a.with_log(log.clone()),
        Err(e) => {
            eprintln!("Invalid configuration: {e}");
            return;
        }
    };
    let store = MemorySignatureStore::new();

    for session_id in ["week-1", "week-2"] {
        let analysis = match analyzer.analyze_with_store(&build_session(session_id), &store) {
            Ok(a) => a,
            Err(e) => {
                eprintln!("{session_id}: analysis failed: {e}");
                continue;
            }
        };

        println!("Session {session_id} ({:?})", analysis.status);
        println!("  Timeline points: {}", analysis.timeline.len());

        for point in analysis.timeline.iter().filter(|p| p.spike) {
            println!("  Spike at t={:.0}s (intensity {:.2})", point.t, point.intensity);
        }

        for marker in &analysis.incongruence_markers {
            println!(
                "  {} from {:.0}s to {:.0}s{}",
                marker.kind,
                marker.start,
                marker.end,
                marker
                    .transcript_snippet
                    .as_deref()
                    .map(|s| format!(": \"{s}\""))
                    .unwrap_or_default()
            );
            println!("    {}", marker.explanation);
        }

        if let Some(ref summary) = analysis.summary {
            for event in summary.congruence_events.iter().take(3) {
                println!(
                    "  Low congruence at t={:.0}s (score {:.2})",
                    event.t, event.score
                );
            }
        }

        match analysis.pattern_match.observation {
            Some(ref observation) => println!("  {observation}"),
            None => println!("  No repetition of earlier sessions"),
        }
        println!();
    }

    println!("{}", log.summary());
}
