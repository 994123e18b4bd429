// src/main.rs
use clap::{Parser, Subcommand};
use std::convert::TryFrom;
use std::error::Error;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{error, info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use hare_validation::hare::{
    AggregatedMessages, Certificate, InstanceId, Message, MessageBuilder, MessageType, Msg, Round,
    Set, ValidationError, Value,
};
use hare_validation::signing::{Ed25519Verifier, Signer};
use hare_validation::{HareConfig, MessageValidator};

#[derive(Parser)]
#[command(author, version, about = "Validate Hare protocol messages", long_about = None)]
struct Cli {
    /// Log validator decisions at debug level
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Write a signed sample proposal, certificate and config
    Sample {
        /// Output directory
        #[arg(short, long, default_value = ".")]
        out_dir: PathBuf,

        /// Comma-separated value contents
        #[arg(long, value_delimiter = ',', default_value = "block-a,block-b,block-c")]
        values: Vec<String>,
    },
    /// Validate one message at a local round (-1 for the pre-round)
    Message {
        #[arg(short, long)]
        config: PathBuf,

        #[arg(short, long, allow_hyphen_values = true)]
        round: i32,

        file: PathBuf,
    },
    /// Validate a Notify certificate
    Certificate {
        #[arg(short, long)]
        config: PathBuf,

        file: PathBuf,
    },
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();

    let level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder().with_max_level(level).finish();
    tracing::subscriber::set_global_default(subscriber)?;

    match cli.command {
        Command::Sample { out_dir, values } => write_sample(&out_dir, &values),
        Command::Message {
            config,
            round,
            file,
        } => check_message(&config, round, &file),
        Command::Certificate { config, file } => check_certificate(&config, &file),
    }
}

fn load_validator(config_path: &Path) -> Result<MessageValidator, Box<dyn Error>> {
    let config = HareConfig::from_json_file(config_path)?;
    info!(
        "Config: committee {}, threshold {}, set size {}",
        config.committee_size, config.threshold, config.set_size
    );
    // Roles are not checked offline: there is no oracle to ask
    Ok(MessageValidator::without_member_check(
        &config,
        Arc::new(Ed25519Verifier),
    ))
}

fn check_message(config_path: &Path, round: i32, file: &Path) -> Result<(), Box<dyn Error>> {
    let validator = load_validator(config_path)?;
    let local_round = Round::try_from(round)?;
    let message: Message = serde_json::from_str(&fs::read_to_string(file)?)?;

    let msg = match Msg::from_message(message, &Ed25519Verifier) {
        Ok(msg) => msg,
        Err(e) => {
            error!("❌ Signature check failed: {}", e);
            return Ok(());
        }
    };
    if let Some(key) = msg.pub_key {
        info!("Sender: {}", key);
    }

    if !validator.syntactically_validate_message(&msg) {
        error!("❌ Message is syntactically invalid");
        return Ok(());
    }
    info!("✅ Message is syntactically valid");

    match validator.contextually_validate_message(&msg, local_round) {
        Ok(true) => info!("✅ Accepted at round {}", local_round),
        Ok(false) => info!("Message is stale or inapplicable at round {}", local_round),
        Err(ValidationError::EarlyMessage) => {
            warn!("Message is early at round {}; re-check next round", local_round)
        }
        Err(e) => error!("❌ Contextual validation failed: {}", e),
    }
    Ok(())
}

fn check_certificate(config_path: &Path, file: &Path) -> Result<(), Box<dyn Error>> {
    let validator = load_validator(config_path)?;
    let cert: Certificate = serde_json::from_str(&fs::read_to_string(file)?)?;

    if validator.validate_certificate(Some(&cert)) {
        info!("✅ Certificate for {} values is valid", cert.values.len());
    } else {
        error!("❌ Certificate is invalid");
    }
    Ok(())
}

fn write_sample(out_dir: &Path, contents: &[String]) -> Result<(), Box<dyn Error>> {
    let config = HareConfig {
        committee_size: 5,
        threshold: 3,
        set_size: 10,
    };
    config.validate()?;
    if contents.is_empty() {
        return Err("at least one value is required".into());
    }
    fs::create_dir_all(out_dir)?;

    let values: Vec<Value> = contents
        .iter()
        .map(|c| Value::from_content(c.as_bytes()))
        .collect();
    let all = Set::from_values(config.set_size, &values)?;
    let instance = InstanceId(1);

    // Each status reporter sees part of the values; the proposal is their union
    let mut statuses = Vec::with_capacity(config.threshold);
    for i in 0..config.threshold {
        let seen: Vec<Value> = values
            .iter()
            .enumerate()
            .filter(|(j, _)| j % config.threshold == i || *j == 0)
            .map(|(_, v)| *v)
            .collect();
        let status = MessageBuilder::new(MessageType::Status)
            .instance(instance)
            .round(Round::At(0))
            .values(seen)
            .sign(&Signer::generate()?)?;
        statuses.push(status);
    }

    let proposal = MessageBuilder::new(MessageType::Proposal)
        .instance(instance)
        .round(Round::At(1))
        .set(&all)
        .svp(AggregatedMessages::new(statuses))
        .sign(&Signer::generate()?)?;

    let mut commits = Vec::with_capacity(config.threshold);
    for _ in 0..config.threshold {
        let commit = MessageBuilder::new(MessageType::Commit)
            .instance(instance)
            .round(Round::At(2))
            .set(&all)
            .sign(&Signer::generate()?)?;
        commits.push(commit);
    }
    let certificate = Certificate {
        agg_msgs: Some(AggregatedMessages::new(commits)),
        values: all.to_vec(),
    };

    serde_json::to_writer_pretty(File::create(out_dir.join("config.json"))?, &config)?;
    serde_json::to_writer_pretty(File::create(out_dir.join("proposal.json"))?, &proposal)?;
    serde_json::to_writer_pretty(File::create(out_dir.join("certificate.json"))?, &certificate)?;

    info!(
        "Wrote sample for {} values ({}) to {}",
        all.len(),
        all,
        out_dir.display()
    );
    Ok(())
}
