use std::{
    env,
    io::{self, BufRead},
    process,
};

use anyhow::{Context, Result};
use log::info;
use worker::{PpoConfig, RewardClient};

fn usage(program: &str) -> ! {
    eprintln!(
        "Usage: {program} score [message...]\n       {program} inspect-head <path>\n\n\
         `score` posts to $REWARD_SERVER_URL, reading one message per stdin line\n\
         when none are given."
    );
    process::exit(1);
}

fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let program = args.first().map(String::as_str).unwrap_or("ppo-glue");

    match args.get(1).map(String::as_str) {
        Some("score") => score(&args[2..]),
        Some("inspect-head") => match args.get(2) {
            Some(path) => inspect_head(path),
            None => usage(program),
        },
        _ => usage(program),
    }
}

fn score(messages: &[String]) -> Result<()> {
    let config = PpoConfig::from_env().context("reading the PPO config from the environment")?;
    let url = config
        .reward_server_url
        .context("REWARD_SERVER_URL is not set")?;

    let messages = if messages.is_empty() {
        io::stdin()
            .lock()
            .lines()
            .collect::<io::Result<Vec<_>>>()
            .context("reading messages from stdin")?
    } else {
        messages.to_vec()
    };

    info!("scoring {} message(s) at {url}", messages.len());
    let client = RewardClient::new(url);
    let scores = client
        .get_rewards(&messages)
        .with_context(|| format!("scoring against {}", client.url()))?;

    for score in scores {
        println!("{score}");
    }
    Ok(())
}

fn inspect_head(path: &str) -> Result<()> {
    let params = model::load_valuehead_params(path)
        .with_context(|| format!("loading the value head from {path}"))?;

    println!(
        "weight: shape {:?}, dtype {}",
        params.weight.shape(),
        params.weight.dtype()
    );
    println!("bias:   {:?}", params.bias.to_f32().iter().collect::<Vec<_>>());
    Ok(())
}
