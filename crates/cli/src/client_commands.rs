use {
    anyhow::{Context, Result, bail},
    tracing::info,
};

use {
    warden_config::WardenConfig,
    warden_remote::{MacAddress, MagicPacketSender, Prober, RemoteClient, WakeSignal},
};

fn remote_client(config: &WardenConfig) -> Result<RemoteClient> {
    if config.client.address.trim().is_empty() {
        bail!("client.address is not set");
    }
    Ok(RemoteClient::with_timeouts(
        config.client.base_url(),
        config.timing.probe_timeout(),
        config.timing.request_timeout(),
    ))
}

/// One probe; an offline client is an error so the exit status reflects it.
pub async fn probe(config: &WardenConfig) -> Result<()> {
    let client = remote_client(config)?;
    if client.probe().await {
        println!("{} is online", client.base_url());
        Ok(())
    } else {
        bail!("{} is offline", client.base_url())
    }
}

pub async fn wake(config: &WardenConfig) -> Result<()> {
    let mac: MacAddress = config
        .client
        .mac
        .parse()
        .with_context(|| format!("invalid client.mac {:?}", config.client.mac))?;
    let sender = MagicPacketSender::new(mac, config.client.wake_broadcast.clone());
    sender.wake().await.context("failed to send magic packet")?;
    info!(%mac, target = %config.client.wake_broadcast, "magic packet sent");
    println!("Magic packet sent to {mac}");
    Ok(())
}

/// Every reason the bot would refuse to start.
pub fn problems(config: &WardenConfig) -> Vec<String> {
    let mut problems: Vec<String> = config.validate().iter().map(ToString::to_string).collect();
    if !config.client.mac.trim().is_empty()
        && let Err(e) = config.client.mac.parse::<MacAddress>()
    {
        problems.push(format!("client.mac: {e}"));
    }
    problems
}

/// Effective settings with the token reduced to whether it is set.
pub fn describe(config: &WardenConfig) -> Vec<String> {
    let discord = &config.discord;
    let timing = &config.timing;
    vec![
        format!(
            "discord.token          = {}",
            if discord.token.is_some() {
                "[set]"
            } else {
                "[missing]"
            }
        ),
        format!("discord.command_prefix = {:?}", discord.command_prefix),
        format!("discord.dm_enabled     = {}", discord.dm_enabled),
        format!(
            "discord.presence       = {} (every {}ms)",
            discord.presence, discord.presence_interval_ms
        ),
        format!("client.url             = {}", config.client.base_url()),
        format!("client.mac             = {}", config.client.mac),
        format!("client.wake_broadcast  = {}", config.client.wake_broadcast),
        format!(
            "timing                 = probe {}ms, request {}ms, online {}ms every {}ms, reboot grace {}ms, flush {}ms",
            timing.probe_timeout_ms,
            timing.request_timeout_ms,
            timing.online_timeout_ms,
            timing.poll_interval_ms,
            timing.reboot_grace_ms,
            timing.flush_interval_ms
        ),
    ]
}

pub fn check_config(config: &WardenConfig) -> Result<()> {
    for line in describe(config) {
        println!("{line}");
    }
    let problems = problems(config);
    if problems.is_empty() {
        println!("Configuration OK");
        return Ok(());
    }
    for problem in &problems {
        eprintln!("error: {problem}");
    }
    bail!("{} configuration problem(s)", problems.len())
}
