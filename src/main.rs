//! Privacy Amplification CLI
//!
//! Runs one reconciliation session between two in-process peers and
//! prints the agreed secret.

use clap::Parser;
use privacy_amplification::{
    analysis::HealthMonitor,
    config::FileConfig,
    metrics::{MetricsRegistry, MetricsSnapshot},
    protocol::{run_session, AbortSignal, Role},
    source::{BoxedSource, SourceConfig},
};
use std::path::PathBuf;
use tracing::{error, info, warn};

/// Agree on a shared secret over a simulated noisy channel.
#[derive(Parser, Debug)]
#[command(name = "privacy-amp", version, about)]
struct Args {
    /// TOML configuration file.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Raw secret length in bits.
    #[arg(long)]
    secret_len: Option<usize>,

    /// Per-bit flip probability of the private link.
    #[arg(long)]
    error_rate: Option<f64>,

    /// Seed for link noise and unseeded ChaCha sources.
    #[arg(long)]
    seed: Option<u64>,

    /// Reconciliation rounds allowed before giving up.
    #[arg(long)]
    max_rounds: Option<u32>,

    /// Run the statistical battery on both sources first.
    #[arg(long)]
    qualify: bool,

    /// Print Prometheus metrics after the session.
    #[arg(long)]
    print_metrics: bool,
}

fn main() {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let args = Args::parse();
    info!("Privacy Amplification v{}", privacy_amplification::VERSION);

    let mut config = match &args.config {
        Some(path) => match FileConfig::from_file(path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("Failed to load {}: {}", path.display(), e);
                std::process::exit(1);
            }
        },
        None => FileConfig::default(),
    };
    apply_overrides(&mut config, &args);
    if let Err(e) = config.validate() {
        eprintln!("Invalid configuration: {}", e);
        std::process::exit(1);
    }

    let abort = AbortSignal::new();
    let handler_abort = abort.clone();
    if let Err(e) = ctrlc::set_handler(move || {
        warn!("Interrupt received, aborting session");
        handler_abort.abort();
    }) {
        warn!("Failed to install interrupt handler: {}", e);
    }

    let registry = if args.print_metrics {
        match MetricsRegistry::new() {
            Ok(registry) => Some(registry),
            Err(e) => {
                warn!("Metrics disabled: {}", e);
                None
            }
        }
    } else {
        None
    };

    let mut initiator_source = build_source(Role::Initiator, &config.initiator_source);
    let mut responder_source = build_source(Role::Responder, &config.responder_source);

    if args.qualify {
        for (role, source) in [
            (Role::Initiator, &mut initiator_source),
            (Role::Responder, &mut responder_source),
        ] {
            qualify(role, source, &config, registry.as_ref());
        }
    }

    let result = run_session(
        &config.session,
        &config.link,
        initiator_source,
        responder_source,
        &abort,
    );

    if let Some(registry) = &registry {
        registry.record(&MetricsSnapshot::from_result(&result));
    }

    let exit_code = match &result {
        Ok(outcome) if outcome.agreed() => {
            let report = &outcome.responder;
            info!(
                rounds = report.rounds,
                twiddle = report.twiddle_corrected,
                revealed = report.parities_revealed,
                public_bits = report.public_bits,
                "Session complete"
            );
            println!(
                "Secret ({} bits): {}",
                report.secret.len(),
                report.secret.to_hex()
            );
            0
        }
        Ok(_) => {
            error!("Peers finished with different secrets");
            1
        }
        Err(e) => {
            error!("Session failed: {}", e);
            1
        }
    };

    if let Some(registry) = &registry {
        match registry.encode() {
            Ok(text) => print!("{}", text),
            Err(e) => warn!("Failed to encode metrics: {}", e),
        }
    }

    std::process::exit(exit_code);
}

fn apply_overrides(config: &mut FileConfig, args: &Args) {
    if let Some(secret_len) = args.secret_len {
        config.session.secret_len = secret_len;
        config.session.min_secret_len = config.session.min_secret_len.min(secret_len);
    }
    if let Some(error_rate) = args.error_rate {
        config.link.error_rate = error_rate;
    }
    if let Some(max_rounds) = args.max_rounds {
        config.session.max_rounds = max_rounds;
    }
    if let Some(seed) = args.seed {
        config.link.seed = Some(seed);
        seed_if_unseeded(&mut config.initiator_source, seed.wrapping_add(1));
        seed_if_unseeded(&mut config.responder_source, seed.wrapping_add(2));
    }
}

fn seed_if_unseeded(source: &mut SourceConfig, seed: u64) {
    if let SourceConfig::Chacha { seed: slot } = source {
        slot.get_or_insert(seed);
    }
}

fn build_source(role: Role, config: &SourceConfig) -> BoxedSource {
    match config.build() {
        Ok(source) => source,
        Err(e) => {
            eprintln!("Failed to build {} source: {}", role, e);
            std::process::exit(1);
        }
    }
}

fn qualify(
    role: Role,
    source: &mut BoxedSource,
    config: &FileConfig,
    registry: Option<&MetricsRegistry>,
) {
    let settings = &config.qualification;
    let mut monitor =
        HealthMonitor::with_streak_requirement(settings.thresholds.clone(), settings.min_healthy_streak);

    info!(%role, bits = settings.sample_bits, "Qualifying source");
    let healthy = match monitor.qualify(source, settings.sample_bits, settings.max_samples) {
        Ok(healthy) => healthy,
        Err(e) => {
            eprintln!("Failed to qualify {} source: {}", role, e);
            std::process::exit(1);
        }
    };

    if let Some(registry) = registry {
        registry.update_health(monitor.metrics());
    }

    if !healthy {
        if let Some(violation) = &monitor.metrics().last_violation {
            eprintln!("{} source rejected: {}", role, violation);
        } else {
            eprintln!("{} source rejected", role);
        }
        std::process::exit(1);
    }
    info!(%role, samples = monitor.metrics().total_samples, "Source qualified");
}
