use std::{fs, path::PathBuf};

use alloy_primitives::{Address, Bytes, B256};
use anyhow::{anyhow, bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use serde_json::{json, Value};
use smart_session_engine::{
    constants::{APPROVE_SELECTOR, TRANSFER_SELECTOR},
    ids, modules, ownable_binding, AddressBook, ChainContext, ChainReader, ModuleType,
    OwnableKeySigner, PolicyCompiler, PolicyKind, PolicyParams, PolicyStateReader,
    SessionTxBuilder, Token, UpdateActionParams, ValidatorBinding, ValidatorSigner,
};
use time::{format_description::well_known::Rfc3339, OffsetDateTime};
use tracing_subscriber::EnvFilter;

mod rpc;

use rpc::EthersChainReader;

/// Build smart-session transactions and inspect session policy state.
///
/// Nothing is submitted: every command prints JSON for an operation submitter or for inspection.
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Cli {
    /// JSON-RPC endpoint. Required for `state`, and for chain id / install checks when given.
    #[arg(long, env = "RPC_URL", global = true)]
    rpc_url: Option<String>,

    /// Chain id to resolve module addresses for. Read from the RPC endpoint when omitted.
    #[arg(long, global = true)]
    chain_id: Option<u64>,

    /// Address book JSON replacing the built-in deployments.
    #[arg(long, global = true)]
    address_book: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Permission id, plus action and config ids for the given tokens.
    Ids {
        #[command(flatten)]
        binding: BindingArgs,
        #[arg(long)]
        account: Option<Address>,
        #[arg(long = "token")]
        tokens: Vec<Address>,
    },
    /// Transactions enabling a session from a policy params JSON file.
    Enable {
        #[command(flatten)]
        binding: BindingArgs,
        #[arg(long)]
        params: PathBuf,
        /// Account to check for the smart-session module; prepends the install step if missing.
        #[arg(long)]
        account: Option<Address>,
    },
    /// Transaction removing the session.
    Remove {
        #[command(flatten)]
        binding: BindingArgs,
    },
    /// Disable and enable transactions for an update params JSON file.
    Update {
        #[command(flatten)]
        binding: BindingArgs,
        #[arg(long)]
        params: PathBuf,
    },
    /// Transaction uninstalling a module from the account.
    Uninstall {
        #[arg(long)]
        account: Address,
        #[arg(long)]
        module: Address,
        #[arg(long, default_value = "validator")]
        module_type: String,
    },
    /// Current spend-limit or sudo state per token.
    State {
        #[command(flatten)]
        binding: BindingArgs,
        #[arg(long)]
        account: Address,
        #[arg(long)]
        policy: String,
        /// `address:decimals`, repeatable.
        #[arg(long = "token", value_parser = parse_token, required = true)]
        tokens: Vec<Token>,
    },
}

/// How the session validator is bound. Exactly one source must be given.
#[derive(Args, Debug)]
struct BindingArgs {
    /// Owners for an ownable-validator binding (threshold 1).
    #[arg(long = "owner", value_delimiter = ',')]
    owners: Vec<Address>,

    /// Session key (hex); its address becomes the sole ownable-validator owner.
    #[arg(long, env = "SESSION_KEY", hide_env_values = true)]
    session_key: Option<String>,

    /// Explicit validator address, used with `--init-data`.
    #[arg(long, requires = "init_data")]
    validator: Option<Address>,

    #[arg(long)]
    init_data: Option<Bytes>,

    #[arg(long)]
    salt: Option<B256>,
}

impl BindingArgs {
    fn resolve(&self, ctx: &ChainContext) -> Result<ValidatorBinding> {
        let binding = if let Some(validator) = self.validator {
            let init_data = self.init_data.clone().unwrap_or_default();
            ValidatorBinding::new(validator, init_data)
        } else if let Some(key) = &self.session_key {
            let secret = hex::decode(key.trim_start_matches("0x")).context("session key is not hex")?;
            let signer = ValidatorSigner::Ownable(OwnableKeySigner::from_slice(&secret)?);
            return Ok(PolicyCompiler::new(ctx).binding_for(&signer, self.salt)?);
        } else if !self.owners.is_empty() {
            ownable_binding(ctx.modules.ownable_validator, &self.owners)
        } else {
            bail!("no validator binding: pass --owner, --session-key, or --validator/--init-data");
        };
        Ok(match self.salt {
            Some(salt) => binding.with_salt(salt),
            None => binding,
        })
    }
}

fn parse_token(s: &str) -> Result<Token, String> {
    let (address, decimals) = s
        .split_once(':')
        .ok_or_else(|| format!("expected address:decimals, got `{s}`"))?;
    let address = address
        .parse::<Address>()
        .map_err(|e| format!("bad token address `{address}`: {e}"))?;
    let decimals = decimals
        .parse::<u8>()
        .map_err(|e| format!("bad decimals `{decimals}`: {e}"))?;
    Ok(Token::new(address, decimals))
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let reader = cli
        .rpc_url
        .as_deref()
        .map(EthersChainReader::new)
        .transpose()?;
    let ctx = resolve_context(&cli, reader.as_ref()).await?;

    let output = run(&cli.command, &ctx, reader.as_ref()).await?;
    println!("{}", serde_json::to_string_pretty(&envelope(&ctx, output))?);
    Ok(())
}

async fn resolve_context(cli: &Cli, reader: Option<&EthersChainReader>) -> Result<ChainContext> {
    let book = match &cli.address_book {
        Some(path) => {
            let json = fs::read_to_string(path)
                .with_context(|| format!("failed reading {}", path.display()))?;
            AddressBook::from_json(&json)
                .with_context(|| format!("failed parsing address book {}", path.display()))?
        }
        None => AddressBook::builtin(),
    };
    match (cli.chain_id, reader) {
        (Some(chain_id), _) => Ok(book.context(chain_id)?),
        (None, Some(reader)) => Ok(book.context_for(reader).await?),
        (None, None) => Err(anyhow!("pass --chain-id or --rpc-url to select a chain")),
    }
}

async fn run(
    command: &Command,
    ctx: &ChainContext,
    reader: Option<&EthersChainReader>,
) -> Result<Value> {
    let builder = SessionTxBuilder::new(ctx);
    match command {
        Command::Ids {
            binding,
            account,
            tokens,
        } => {
            let binding = binding.resolve(ctx)?;
            let permission_id = builder.compiler().use_session(&binding).permission_id();
            let actions: Vec<Value> = tokens
                .iter()
                .map(|token| {
                    let transfer = ids::action_id(*token, TRANSFER_SELECTOR);
                    let approve = ids::action_id(*token, APPROVE_SELECTOR);
                    let mut entry = json!({
                        "token": token,
                        "transferActionId": transfer,
                        "approveActionId": approve,
                    });
                    if let Some(account) = account {
                        entry["transferConfigId"] =
                            json!(ids::config_id(*account, permission_id, transfer));
                    }
                    entry
                })
                .collect();
            Ok(json!({ "permissionId": permission_id, "actions": actions }))
        }
        Command::Enable {
            binding,
            params,
            account,
        } => {
            let binding = binding.resolve(ctx)?;
            let params: PolicyParams = read_json(params)?;
            let transactions = match (account, reader) {
                (Some(account), Some(reader)) => {
                    builder
                        .build_enable_session_steps(reader, *account, &params, &binding)
                        .await?
                }
                _ => vec![builder.build_enable_session(&params, &binding)?],
            };
            let session = builder.compiler().compile(&params, &binding)?;
            Ok(json!({
                "permissionId": session.permission_id(),
                "fingerprint": session.fingerprint(),
                "transactions": transactions,
            }))
        }
        Command::Remove { binding } => {
            let binding = binding.resolve(ctx)?;
            Ok(json!({ "transactions": [builder.build_remove_session(&binding)] }))
        }
        Command::Update { binding, params } => {
            let binding = binding.resolve(ctx)?;
            let params: UpdateActionParams = read_json(params)?;
            Ok(json!({
                "disable": builder.build_disable_action_policies(&params, &binding),
                "enable": builder.build_enable_action_policies(&params, &binding),
            }))
        }
        Command::Uninstall {
            account,
            module,
            module_type,
        } => {
            let reader = require_reader(reader)?;
            let module_type: ModuleType = module_type
                .parse()
                .map_err(|_| anyhow!("unknown module type `{module_type}`"))?;
            let tx = modules::build_uninstall_module(
                reader,
                *account,
                *module,
                module_type,
                ctx.modules.smart_session,
            )
            .await;
            Ok(json!({ "transactions": [tx] }))
        }
        Command::State {
            binding,
            account,
            policy,
            tokens,
        } => {
            let reader = require_reader(reader)?;
            let binding = binding.resolve(ctx)?;
            let kind: PolicyKind = policy.parse()?;
            let state_reader = PolicyStateReader::new(ctx, reader);
            let state = match kind {
                PolicyKind::SpendLimit => json!(
                    state_reader
                        .read_spend_limit_state(tokens, *account, &binding)
                        .await
                ),
                PolicyKind::Sudo => json!(
                    state_reader
                        .read_sudo_access_state(tokens, *account, &binding)
                        .await
                ),
            };
            Ok(json!({ "policy": kind, "tokens": state }))
        }
    }
}

fn require_reader<R: ChainReader>(reader: Option<&R>) -> Result<&R> {
    reader.ok_or_else(|| anyhow!("this command needs --rpc-url (or RPC_URL)"))
}

fn read_json<T: serde::de::DeserializeOwned>(path: &PathBuf) -> Result<T> {
    let raw = fs::read_to_string(path).with_context(|| format!("failed reading {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("failed parsing JSON in {}", path.display()))
}

fn envelope(ctx: &ChainContext, output: Value) -> Value {
    let now = OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .unwrap_or_else(|_| "unknown".to_string());
    json!({
        "chainId": ctx.chain_id,
        "generated_at": now,
        "result": output,
    })
}
