//! EventSub admin CLI.
//!
//! Manages subscriptions, conduits and conduit shards through the Helix
//! API. Results are printed to stdout as JSON lines; logs go to stderr.

use std::io::Write;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use eventsub_client::{ClientSettings, HelixClient, RequestContext};
use eventsub_core::{
    CreateSubscriptionRequest, ShardStatus, ShardTransport, ShardUpdate, SubscriptionFilter,
    SubscriptionStatus, Transport,
};
use futures::TryStreamExt;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::json;
use tracing::{debug, warn};

#[derive(Debug, Parser)]
#[command(name = "eventsub", version, about = "Manage EventSub subscriptions and conduits")]
struct Cli {
    /// Configuration file
    #[arg(long, global = true, default_value = "eventsub.toml")]
    config: String,

    /// Client id for this invocation, overriding the configured one
    #[arg(long, global = true)]
    client_id: Option<String>,

    /// Access token for this invocation, overriding the configured one
    #[arg(long, global = true)]
    access_token: Option<String>,

    #[command(subcommand)]
    command: Command,
}

impl Cli {
    fn context(&self) -> RequestContext {
        let mut ctx = RequestContext::new();
        if let Some(client_id) = &self.client_id {
            ctx = ctx.with_client_id(client_id.clone());
        }
        if let Some(access_token) = &self.access_token {
            ctx = ctx.with_access_token(access_token.clone());
        }
        ctx
    }
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Subscription registry
    #[command(subcommand)]
    Subscriptions(SubscriptionCommand),
    /// Conduit lifecycle
    #[command(subcommand)]
    Conduits(ConduitCommand),
    /// Conduit shard assignment
    #[command(subcommand)]
    Shards(ShardCommand),
}

#[derive(Debug, Subcommand)]
enum SubscriptionCommand {
    /// List subscriptions across all pages
    List {
        #[arg(long, value_parser = parse_subscription_status)]
        status: Option<SubscriptionStatus>,
        #[arg(long = "type")]
        subscription_type: Option<String>,
        #[arg(long)]
        user_id: Option<String>,
    },
    /// Create a subscription
    Create {
        #[arg(long = "type")]
        subscription_type: String,
        #[arg(long)]
        version: String,
        /// Condition entry as key=value, repeatable
        #[arg(long = "condition", value_parser = parse_key_value, required = true)]
        condition: Vec<(String, String)>,
        #[command(flatten)]
        transport: TransportArgs,
    },
    /// Delete a subscription by id
    Delete { id: String },
}

#[derive(Debug, Subcommand)]
enum ConduitCommand {
    /// List conduits owned by the client
    List,
    /// Create a conduit
    Create { shard_count: u32 },
    /// Change the shard count of a conduit
    Update { id: String, shard_count: u32 },
    /// Delete a conduit
    Delete { id: String },
}

#[derive(Debug, Subcommand)]
enum ShardCommand {
    /// List the shards of a conduit across all pages
    List {
        conduit_id: String,
        #[arg(long, value_parser = parse_shard_status)]
        status: Option<ShardStatus>,
    },
    /// Point a shard at a websocket session
    AssignWebsocket { conduit_id: String, shard_id: String, session_id: String },
    /// Point a shard at a webhook callback
    AssignWebhook {
        conduit_id: String,
        shard_id: String,
        #[arg(long)]
        callback: String,
        /// Signing secret; omitted from the request when not given
        #[arg(long)]
        secret: Option<String>,
    },
}

/// Exactly one of websocket, webhook or conduit.
#[derive(Debug, Args)]
struct TransportArgs {
    /// Websocket session id
    #[arg(long, conflicts_with_all = ["webhook", "conduit"])]
    websocket: Option<String>,
    /// Webhook callback URL
    #[arg(long, requires = "secret", conflicts_with = "conduit")]
    webhook: Option<String>,
    /// Webhook signing secret
    #[arg(long, requires = "webhook")]
    secret: Option<String>,
    /// Conduit id
    #[arg(long)]
    conduit: Option<String>,
}

impl TransportArgs {
    fn into_transport(self) -> Result<Transport> {
        match (self.websocket, self.webhook, self.secret, self.conduit) {
            (Some(session_id), None, None, None) => Ok(Transport::websocket(session_id)),
            (None, Some(callback), Some(secret), None) => Ok(Transport::webhook(callback, secret)),
            (None, None, None, Some(conduit_id)) => Ok(Transport::conduit(conduit_id)),
            _ => bail!("exactly one of --websocket, --webhook or --conduit is required"),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let settings = ClientSettings::load_from(&cli.config)?;
    init_tracing(&settings.rust_log);
    debug!(
        base_url = %settings.base_url,
        client_id = ?settings.client_id,
        access_token = ?settings.access_token_masked(),
        "Configuration loaded"
    );

    let ctx = cli.context();
    let client = HelixClient::with_reqwest(settings).context("Failed to build HTTP client")?;

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    run(cli.command, &client, &ctx, &mut out).await
}

/// Initializes tracing, preferring `RUST_LOG` over the configured filter.
fn init_tracing(default_filter: &str) {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_filter))
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    let fmt_layer = fmt::layer().with_writer(std::io::stderr).with_target(true);

    tracing_subscriber::registry().with(filter).with(fmt_layer).init();
}

async fn run(
    command: Command,
    client: &HelixClient,
    ctx: &RequestContext,
    out: &mut impl Write,
) -> Result<()> {
    match command {
        Command::Subscriptions(command) => run_subscriptions(command, client, ctx, out).await,
        Command::Conduits(command) => run_conduits(command, client, ctx, out).await,
        Command::Shards(command) => run_shards(command, client, ctx, out).await,
    }
}

async fn run_subscriptions(
    command: SubscriptionCommand,
    client: &HelixClient,
    ctx: &RequestContext,
    out: &mut impl Write,
) -> Result<()> {
    match command {
        SubscriptionCommand::List { status, subscription_type, user_id } => {
            let mut filter = SubscriptionFilter::default();
            if let Some(status) = status {
                filter = filter.with_status(status);
            }
            if let Some(subscription_type) = subscription_type {
                filter = filter.with_type(subscription_type);
            }
            if let Some(user_id) = user_id {
                filter = filter.with_user_id(user_id);
            }

            let mut subscriptions = client.subscriptions(ctx, filter, None);
            while let Some(subscription) = subscriptions.try_next().await? {
                emit(out, &subscription)?;
            }
        },
        SubscriptionCommand::Create { subscription_type, version, condition, transport } => {
            let request = CreateSubscriptionRequest::new(
                subscription_type,
                version,
                condition,
                transport.into_transport()?,
            )?;
            let subscription = client.create_subscription(ctx, &request).await?;
            emit(out, &subscription)?;
        },
        SubscriptionCommand::Delete { id } => {
            let deleted = client.delete_subscription(ctx, &id).await?;
            emit(out, &json!({"id": id, "deleted": deleted}))?;
        },
    }
    Ok(())
}

async fn run_conduits(
    command: ConduitCommand,
    client: &HelixClient,
    ctx: &RequestContext,
    out: &mut impl Write,
) -> Result<()> {
    match command {
        ConduitCommand::List => {
            for conduit in client.list_conduits(ctx).await? {
                emit(out, &conduit)?;
            }
        },
        ConduitCommand::Create { shard_count } => {
            emit(out, &client.create_conduit(ctx, shard_count).await?)?;
        },
        ConduitCommand::Update { id, shard_count } => {
            emit(out, &client.update_conduit(ctx, &id, shard_count).await?)?;
        },
        ConduitCommand::Delete { id } => {
            let deleted = client.delete_conduit(ctx, &id).await?;
            emit(out, &json!({"id": id, "deleted": deleted}))?;
        },
    }
    Ok(())
}

async fn run_shards(
    command: ShardCommand,
    client: &HelixClient,
    ctx: &RequestContext,
    out: &mut impl Write,
) -> Result<()> {
    let (conduit_id, update) = match command {
        ShardCommand::List { conduit_id, status } => {
            let mut pages = client.conduit_shard_pages(ctx, conduit_id, status, None);
            while let Some(page) = pages.try_next().await? {
                for shard in &page.data {
                    emit(out, shard)?;
                }
            }
            return Ok(());
        },
        ShardCommand::AssignWebsocket { conduit_id, shard_id, session_id } => {
            (conduit_id, ShardUpdate::new(shard_id, ShardTransport::websocket(session_id)))
        },
        ShardCommand::AssignWebhook { conduit_id, shard_id, callback, secret } => {
            let transport = match secret {
                Some(secret) => ShardTransport::webhook(callback, secret),
                None => ShardTransport::webhook_without_secret(callback),
            };
            (conduit_id, ShardUpdate::new(shard_id, transport))
        },
    };

    let result = client.update_conduit_shards(ctx, &conduit_id, vec![update]).await?;
    emit(out, &result)?;

    if !result.is_complete() {
        warn!(errored = result.errored.len(), "Shard update rejected");
        bail!("shard update rejected: {}", result.errored_ids().collect::<Vec<_>>().join(", "));
    }
    Ok(())
}

/// Writes one JSON line.
fn emit(out: &mut impl Write, value: &impl Serialize) -> Result<()> {
    serde_json::to_writer(&mut *out, value).context("Failed to write output")?;
    writeln!(out).context("Failed to write output")?;
    Ok(())
}

fn parse_wire<T: DeserializeOwned>(value: &str) -> Result<T, String> {
    serde_json::from_value(serde_json::Value::String(value.to_string())).map_err(|e| e.to_string())
}

fn parse_subscription_status(value: &str) -> Result<SubscriptionStatus, String> {
    match parse_wire(value)? {
        SubscriptionStatus::Unknown => Err(format!("unknown subscription status '{value}'")),
        status => Ok(status),
    }
}

fn parse_shard_status(value: &str) -> Result<ShardStatus, String> {
    match parse_wire(value)? {
        ShardStatus::Unknown => Err(format!("unknown shard status '{value}'")),
        status => Ok(status),
    }
}

fn parse_key_value(value: &str) -> Result<(String, String), String> {
    let (key, value) =
        value.split_once('=').ok_or_else(|| format!("expected key=value, got '{value}'"))?;
    Ok((key.to_string(), value.to_string()))
}

#[cfg(test)]
mod tests {
    use eventsub_testing::{fake_client, fixtures::TEST_SECRET};
    use serde_json::Value;

    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("eventsub").chain(args.iter().copied())).unwrap()
    }

    async fn execute(client: &HelixClient, args: &[&str]) -> Result<Vec<Value>> {
        let mut out = Vec::new();
        run(parse(args).command, client, &RequestContext::new(), &mut out).await?;
        Ok(String::from_utf8(out)
            .unwrap()
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect())
    }

    #[test]
    fn status_filters_parse_wire_names() {
        assert_eq!(
            parse_subscription_status("authorization_revoked"),
            Ok(SubscriptionStatus::AuthorizationRevoked)
        );
        assert_eq!(parse_shard_status("disabled"), Ok(ShardStatus::Disabled));
        assert!(parse_subscription_status("bogus").is_err());
        assert!(parse_shard_status("unknown").is_err());
    }

    #[test]
    fn key_value_requires_separator() {
        assert_eq!(
            parse_key_value("broadcaster_user_id=123"),
            Ok(("broadcaster_user_id".to_string(), "123".to_string()))
        );
        assert!(parse_key_value("broadcaster_user_id").is_err());
    }

    #[test]
    fn transport_flags_are_exclusive() {
        let base = ["subscriptions", "create", "--type", "channel.follow", "--version", "2"];
        let args: Vec<_> =
            base.iter().copied().chain(["--condition", "a=b", "--websocket", "s", "--conduit", "c"])
                .collect();
        assert!(Cli::try_parse_from(std::iter::once("eventsub").chain(args)).is_err());

        let args: Vec<_> =
            base.iter().copied().chain(["--condition", "a=b", "--webhook", "https://x"]).collect();
        assert!(Cli::try_parse_from(std::iter::once("eventsub").chain(args)).is_err());
    }

    #[test]
    fn global_credentials_build_context() {
        let cli = parse(&["--client-id", "override", "conduits", "list"]);
        assert_eq!(cli.context(), RequestContext::new().with_client_id("override"));
    }

    #[test]
    fn global_flags_accepted_after_subcommand() {
        let cli = parse(&["conduits", "list", "--config", "staging.toml", "--access-token", "t"]);
        assert_eq!(cli.config, "staging.toml");
        assert_eq!(cli.context(), RequestContext::new().with_access_token("t"));

        assert_eq!(parse(&["conduits", "list"]).config, "eventsub.toml");
    }

    #[tokio::test]
    async fn webhook_shard_assigned_without_secret() {
        let (fake, client) = fake_client();
        fake.seed_conduit("conduit-w", 1).await;

        let assigned = execute(
            &client,
            &["shards", "assign-webhook", "conduit-w", "0", "--callback", "https://example.com/cb"],
        )
        .await
        .unwrap();
        assert_eq!(assigned[0]["accepted"][0]["status"], "webhook_callback_verification_pending");

        let sent = fake.requests().await.pop().unwrap();
        assert_eq!(
            sent.body.unwrap()["shards"][0]["transport"],
            json!({"method": "webhook", "callback": "https://example.com/cb"})
        );
    }

    #[tokio::test]
    async fn conduit_commands_print_json_lines() {
        let (_fake, client) = fake_client();

        let created = execute(&client, &["conduits", "create", "3"]).await.unwrap();
        let id = created[0]["id"].as_str().unwrap().to_string();
        assert_eq!(created[0]["shard_count"], 3);

        let listed = execute(&client, &["conduits", "list"]).await.unwrap();
        assert_eq!(listed, created);

        let deleted = execute(&client, &["conduits", "delete", &id]).await.unwrap();
        assert_eq!(deleted[0]["deleted"], true);
    }

    #[tokio::test]
    async fn shard_assignment_reports_rejection() {
        let (fake, client) = fake_client();
        fake.seed_conduit("conduit-x", 2).await;
        fake.reject_session("gone").await;

        let assigned = execute(&client, &["shards", "assign-websocket", "conduit-x", "0", "live"])
            .await
            .unwrap();
        assert_eq!(assigned[0]["accepted"][0]["id"], "0");

        let error = execute(&client, &["shards", "assign-websocket", "conduit-x", "1", "gone"])
            .await
            .unwrap_err();
        assert!(error.to_string().contains("rejected: 1"));

        let shards =
            execute(&client, &["shards", "list", "conduit-x", "--status", "enabled"]).await.unwrap();
        assert_eq!(shards.len(), 1);
    }

    #[tokio::test]
    async fn webhook_subscription_created_pending() {
        let (_fake, client) = fake_client();

        let created = execute(
            &client,
            &[
                "subscriptions",
                "create",
                "--type",
                "channel.follow",
                "--version",
                "2",
                "--condition",
                "broadcaster_user_id=1",
                "--webhook",
                "https://example.com/eventsub",
                "--secret",
                TEST_SECRET,
            ],
        )
        .await
        .unwrap();
        assert_eq!(created[0]["status"], "webhook_callback_verification_pending");

        let listed = execute(&client, &["subscriptions", "list", "--user-id", "1"]).await.unwrap();
        assert_eq!(listed.len(), 1);
    }
}
