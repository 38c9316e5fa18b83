//! Definitions of CLI arguments and commands for the deploy scripts

use std::{path::PathBuf, time::Duration};

use clap::{Args, Parser, Subcommand};

use crate::{
    chain::RpcChain,
    commands::{deploy, deploy_plan, inspect, inspect_target},
    config::RunConfig,
    constants::{
        ADMIN_ADDRESS_ENV_VAR, DEFAULT_BUILD_DIR, DEFAULT_DEPLOY_TIMEOUT,
        DEFAULT_IMPLEMENTATION_CONTRACT, DEFAULT_PROXY_CONTRACT, NUM_DEPLOY_CONFIRMATIONS,
        PRIVATE_KEY_ENV_VAR, RPC_URL_ENV_VAR,
    },
    errors::ScriptError,
};

/// Deploy and inspect the custodian behind a transparent upgradeable proxy
#[derive(Parser)]
pub struct Cli {
    /// The network to target: development, kovan, kovan-fork, mainnet, or mainnet-fork
    #[arg(short, long, default_value = "development")]
    pub network: String,

    /// Network RPC URL, required for remote networks
    #[arg(short, long, env = RPC_URL_ENV_VAR)]
    pub rpc_url: Option<String>,

    /// Private key of the deployer, required for remote networks.
    /// Local networks fall back to the node's first managed account.
    #[arg(short, long, env = PRIVATE_KEY_ENV_VAR, hide_env_values = true)]
    pub priv_key: Option<String>,

    /// Path to a `deployments.json` file
    #[arg(short, long, default_value = "deployments.json")]
    pub deployments_path: PathBuf,

    /// The command to run
    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    /// Resolve the run configuration and execute the command
    pub async fn run(self) -> Result<(), ScriptError> {
        let Cli {
            network,
            rpc_url,
            priv_key,
            deployments_path,
            command,
        } = self;
        let config = RunConfig::resolve(&network, rpc_url, priv_key)?;

        // Offline checks run before connecting to the node
        match command {
            Command::Deploy(args) => {
                let plan = deploy_plan(&args, config.network)?;
                let config = config
                    .with_confirmations(args.confirmations)
                    .with_timeout(args.timeout());

                let chain = RpcChain::connect(&config).await?;
                deploy(&chain, &plan, &deployments_path).await?;
            }
            Command::Inspect(args) => {
                let proxy = inspect_target(&args, config.network, &deployments_path)?;

                let chain = RpcChain::connect(&config).await?;
                inspect(&chain, proxy).await?;
            }
        }

        Ok(())
    }
}

/// The commands the scripts support
#[derive(Subcommand)]
pub enum Command {
    /// Deploy the implementation and its initialized proxy
    Deploy(DeployArgs),
    /// Read the implementation and admin of a deployed proxy
    Inspect(InspectArgs),
}

/// Deploy the custodian implementation behind a
/// [`TransparentUpgradeableProxy`](https://docs.openzeppelin.com/contracts/3.x/api/proxy#TransparentUpgradeableProxy),
/// initializing it in the proxy's constructor.
///
/// Calls made to the proxy by any account other than the admin are forwarded
/// to the implementation.
#[derive(Args)]
pub struct DeployArgs {
    /// Address of the proxy administrator.
    /// Required on every network but development, which defaults to the
    /// node's first account.
    #[arg(short, long, env = ADMIN_ADDRESS_ENV_VAR)]
    pub admin: Option<String>,

    /// Directory holding the compiled contract artifacts
    #[arg(short, long, default_value = DEFAULT_BUILD_DIR)]
    pub build_dir: PathBuf,

    /// Name of the implementation contract artifact
    #[arg(short, long, default_value = DEFAULT_IMPLEMENTATION_CONTRACT)]
    pub implementation: String,

    /// Name of the proxy contract artifact
    #[arg(long, default_value = DEFAULT_PROXY_CONTRACT)]
    pub proxy_contract: String,

    /// Calldata, in hex form, with which the proxy calls the implementation
    /// at construction. Defaults to `initialize()`; pass `0x` to skip
    /// initialization.
    #[arg(long)]
    pub init_calldata: Option<String>,

    /// Number of confirmations to wait for on each deployment
    #[arg(long, default_value_t = NUM_DEPLOY_CONFIRMATIONS)]
    pub confirmations: u64,

    /// Seconds to wait for each deployment to be mined
    #[arg(long, default_value_t = DEFAULT_DEPLOY_TIMEOUT.as_secs())]
    pub timeout_secs: u64,
}

impl DeployArgs {
    /// How long to wait for each deployment to be mined
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Inspect a deployed proxy
#[derive(Args)]
pub struct InspectArgs {
    /// Address of the proxy contract.
    /// Defaults to the proxy recorded for the network in the deployments file.
    #[arg(long)]
    pub proxy: Option<String>,
}

#[cfg(test)]
mod tests {
    use clap::{CommandFactory, Parser};

    use super::{Cli, Command};

    #[test]
    fn test_cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_deploy_defaults() {
        let cli = Cli::try_parse_from(["custodian-scripts", "deploy"]).unwrap();
        assert_eq!(cli.network, "development");

        let Command::Deploy(args) = cli.command else {
            panic!("expected the deploy command");
        };
        assert_eq!(args.implementation, "Custodian");
        assert_eq!(args.proxy_contract, "TransparentUpgradeableProxy");
        assert_eq!(args.confirmations, 1);
        assert_eq!(args.timeout_secs, 120);
    }

    #[test]
    fn test_inspect_arguments() {
        let cli = Cli::try_parse_from([
            "custodian-scripts",
            "--network",
            "kovan",
            "inspect",
            "--proxy",
            "0xe7f1725e7734ce288f8367e1bb143e90bb3f0512",
        ])
        .unwrap();
        assert_eq!(cli.network, "kovan");
        assert!(matches!(cli.command, Command::Inspect(args) if args.proxy.is_some()));
    }
}
