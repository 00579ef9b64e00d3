//! Bell Pair Demo
//!
//! Records an entangling program, shows that nothing runs until the
//! measurement future is read, then observes the correlated outcome.

use clap::Parser;

use rimfax_demos::{
    init_tracing, print_header, print_result, print_section, print_success, CorrelatedSampler,
};
use rimfax_runtime::{DumpMode, Process, RuntimeError};

#[derive(Parser, Debug)]
#[command(name = "demo-bell")]
#[command(about = "Record and run a Bell-pair program")]
struct Args {
    /// Number of qubits (2 = Bell pair, more = GHZ state)
    #[arg(short = 'n', long, default_value = "2")]
    qubits: u32,

    /// Seed for the stand-in sampler backend
    #[arg(short, long, default_value = "7")]
    seed: u64,

    /// Show the recorded instruction log as JSON before it runs
    #[arg(long)]
    show_log: bool,
}

fn main() {
    init_tracing();
    let args = Args::parse();

    print_header("Bell Pair Demo");
    if let Err(err) = run(&args) {
        eprintln!("Error: {err}");
        std::process::exit(1);
    }
}

fn run(args: &Args) -> Result<(), RuntimeError> {
    let p = Process::new(CorrelatedSampler::new(args.seed));

    print_section("Recording");
    let q = p.alloc(args.qubits)?;
    p.h(&q.qubit(0)?)?;
    for i in 1..args.qubits as usize {
        p.ctrl(&q.qubit(0)?, || p.x(&q.qubit(i)?))?;
    }
    let probs = p.dump(&q, DumpMode::Probabilities)?;
    let m = p.measure(&q)?;

    print_result("Recorded instructions", p.pending_instructions());
    print_result("Backend round-trips so far", p.flush_count());

    if args.show_log {
        print_section("Instruction Log");
        println!("{}", p.instructions_json()?);
    }

    print_section("Observation");
    // The first read flushes everything pending.
    let outcome = m.value()?;
    print_result(
        "Measured state",
        format!("|{outcome:0width$b}⟩", width = args.qubits as usize),
    );
    print_result("Backend round-trips", p.flush_count());

    for (state, probability) in probs.probabilities()? {
        print_result(
            &format!("P(|{state:0width$b}⟩)", width = args.qubits as usize),
            probability,
        );
    }

    let all_ones = (1u64 << args.qubits) - 1;
    if outcome == 0 || outcome as u64 == all_ones {
        print_success("outcome is perfectly correlated");
    }
    Ok(())
}
