// Attempt-latency benchmark for the grading pipeline
// Measures end-to-end grading latency: reset, compile, mutate, run, check
// Target: p50 < 25ms, p95 < 100ms for small fixture exercises

use gradebox::testing::fixtures::{counter_exercise, CounterWorld, Script, ScriptedAdapter};
use gradebox::{Exercise, ExecutionPipeline, NoExplanations, StaticExplanations, WorldKind};
use std::time::{Duration, Instant};

/// Benchmark configuration
const ITERATIONS: usize = 100;
const WARMUP_ITERATIONS: usize = 10;

/// Latency percentiles
struct LatencyStats {
    p50: Duration,
    p95: Duration,
    p99: Duration,
    min: Duration,
    max: Duration,
    mean: Duration,
}

impl LatencyStats {
    fn from_samples(mut samples: Vec<Duration>) -> Self {
        samples.sort();
        let len = samples.len();

        let p50_idx = (len as f64 * 0.50) as usize;
        let p95_idx = (len as f64 * 0.95) as usize;
        let p99_idx = (len as f64 * 0.99) as usize;

        let sum: Duration = samples.iter().sum();
        let mean = sum / len as u32;

        Self {
            p50: samples[p50_idx],
            p95: samples[p95_idx],
            p99: samples[p99_idx],
            min: samples[0],
            max: samples[len - 1],
            mean,
        }
    }

    fn print(&self, label: &str) {
        println!("\n{}", label);
        println!("  p50: {:?}", self.p50);
        println!("  p95: {:?}", self.p95);
        println!("  p99: {:?}", self.p99);
        println!("  min: {:?}", self.min);
        println!("  max: {:?}", self.max);
        println!("  mean: {:?}", self.mean);
    }
}

/// Benchmark result
struct BenchmarkResult {
    scenario: String,
    stats: LatencyStats,
    passed: bool,
    reason: Option<String>,
}

impl BenchmarkResult {
    fn print(&self) {
        println!("\n=== {} ===", self.scenario);
        self.stats.print("Latency");

        match &self.reason {
            None => println!("✅ PASS"),
            Some(reason) => println!("❌ FAIL: {}", reason),
        }
    }
}

fn set_answer(exercise: &mut Exercise, index: usize, value: i64) {
    CounterWorld::set_value(
        exercise
            .worlds_mut()
            .worlds_mut(WorldKind::Answer)
            .unwrap()[index]
            .as_mut(),
        value,
    );
}

fn check_budget(
    scenario: &str,
    stats: LatencyStats,
    p50_budget: Duration,
    p95_budget: Duration,
) -> BenchmarkResult {
    let passed = stats.p50 < p50_budget && stats.p95 < p95_budget;
    let reason = if !passed {
        Some(format!(
            "p50={:?} (target <{:?}), p95={:?} (target <{:?})",
            stats.p50, p50_budget, stats.p95, p95_budget
        ))
    } else {
        None
    };

    BenchmarkResult {
        scenario: scenario.to_string(),
        stats,
        passed,
        reason,
    }
}

/// Full passing attempt against a single world.
fn benchmark_single_world_attempt() -> BenchmarkResult {
    let mut exercise = counter_exercise("bench.single", &[0], 0);
    set_answer(&mut exercise, 0, 12);
    let adapter = ScriptedAdapter::new("bench").with_student(Script::Steps(12));

    let mut samples = Vec::new();

    // Warmup
    for _ in 0..WARMUP_ITERATIONS {
        let _ = exercise.run(&adapter, &NoExplanations);
    }

    // Actual benchmark
    for _ in 0..ITERATIONS {
        let start = Instant::now();
        let _ = exercise.run(&adapter, &NoExplanations);
        samples.push(start.elapsed());
    }

    check_budget(
        "Single-world attempt",
        LatencyStats::from_samples(samples),
        Duration::from_millis(25),
        Duration::from_millis(100),
    )
}

/// Full passing attempt against eight worlds run in parallel.
fn benchmark_eight_world_attempt() -> BenchmarkResult {
    let mut exercise = counter_exercise("bench.eight", &[0, 1, 2, 3, 4, 5, 6, 7], 0);
    for index in 0..8 {
        set_answer(&mut exercise, index, index as i64 + 12);
    }
    let adapter = ScriptedAdapter::new("bench").with_student(Script::Steps(12));

    let mut samples = Vec::new();

    for _ in 0..WARMUP_ITERATIONS {
        let _ = exercise.run(&adapter, &NoExplanations);
    }

    for _ in 0..ITERATIONS {
        let start = Instant::now();
        let _ = exercise.run(&adapter, &NoExplanations);
        samples.push(start.elapsed());
    }

    check_budget(
        "Eight-world attempt",
        LatencyStats::from_samples(samples),
        Duration::from_millis(50),
        Duration::from_millis(200),
    )
}

/// Failing attempt that scans and matches a known wrong implementation.
fn benchmark_known_bug_matching() -> BenchmarkResult {
    let mut exercise = counter_exercise("bench.bug", &[0], 2);
    set_answer(&mut exercise, 0, 100);
    let adapter = ScriptedAdapter::new("bench")
        .with_student(Script::Steps(3))
        .with_known_bug(Script::Steps(7))
        .with_known_bug(Script::Steps(3));

    let mut explanations = StaticExplanations::new();
    explanations.insert("bench.bug", 1, "en", "You only added 3.");

    // Bug states are materialized once at authoring time, not per attempt.
    let pipeline = ExecutionPipeline::new(&adapter, &explanations);
    for bug in 0..2 {
        if !pipeline
            .run_known_bug(&mut exercise, bug)
            .map(|report| report.succeeded())
            .unwrap_or(false)
        {
            panic!("known-bug setup failed for bug {}", bug);
        }
    }

    let mut samples = Vec::new();

    for _ in 0..WARMUP_ITERATIONS {
        let _ = pipeline.run(&mut exercise);
    }

    for _ in 0..ITERATIONS {
        let start = Instant::now();
        let _ = pipeline.run(&mut exercise);
        samples.push(start.elapsed());
    }

    check_budget(
        "Known-bug matching attempt",
        LatencyStats::from_samples(samples),
        Duration::from_millis(25),
        Duration::from_millis(100),
    )
}

/// Serialize an exercise to its wire form and load it back.
fn benchmark_wire_round_trip() -> BenchmarkResult {
    CounterWorld::register();
    let mut exercise = counter_exercise("bench.wire", &[0, 1, 2, 3], 0);
    for index in 0..4 {
        set_answer(&mut exercise, index, 9);
    }

    let mut samples = Vec::new();

    for _ in 0..WARMUP_ITERATIONS {
        let doc = exercise.to_wire().expect("serialize");
        let _ = Exercise::from_wire(&doc).expect("load");
    }

    for _ in 0..ITERATIONS {
        let start = Instant::now();
        let doc = exercise.to_wire().expect("serialize");
        let _ = Exercise::from_wire(&doc).expect("load");
        samples.push(start.elapsed());
    }

    check_budget(
        "Wire round trip",
        LatencyStats::from_samples(samples),
        Duration::from_millis(10),
        Duration::from_millis(50),
    )
}

fn main() {
    env_logger::init();

    println!("=== Gradebox Attempt-Latency Benchmark ===");
    println!(
        "Iterations: {} (after {} warmup)",
        ITERATIONS, WARMUP_ITERATIONS
    );

    let results = vec![
        benchmark_single_world_attempt(),
        benchmark_eight_world_attempt(),
        benchmark_known_bug_matching(),
        benchmark_wire_round_trip(),
    ];

    // Print all results
    for result in &results {
        result.print();
    }

    // Summary
    let passed_count = results.iter().filter(|r| r.passed).count();
    let total_count = results.len();

    println!("\n=== Summary ===");
    println!("{}/{} scenarios passed", passed_count, total_count);

    if passed_count == total_count {
        println!("✅ All latency budgets met");
        std::process::exit(0);
    } else {
        println!("❌ Some latency budgets exceeded");
        std::process::exit(1);
    }
}
