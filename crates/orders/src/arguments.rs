use {
    crate::{
        adapter::{OrderRef, ProtocolVersion},
        builder::OrderParams,
        error::Error,
        submission::SubmissionMode,
    },
    alloy::{
        primitives::{Address, B256, U256},
        signers::local::PrivateKeySigner,
    },
    model::{OrderRequest, OrderType, TimeInForce},
    std::{
        fmt::{self, Display, Formatter},
        time::Duration,
    },
    url::Url,
};

#[derive(clap::Parser)]
#[clap(about = "Creates, cancels and tracks orders on a tokenized security order processor")]
pub struct Arguments {
    #[clap(long, env, default_value = "warn,orders=debug,fee=debug,ethrpc=info")]
    pub log_filter: String,

    #[clap(long, env, default_value = "error")]
    pub log_stderr_threshold: tracing::Level,

    #[clap(long, env)]
    pub use_json_logs: bool,

    /// Hex encoded private key of the account that places orders.
    #[clap(long, env, hide_env_values = true)]
    pub private_key: Option<String>,

    /// HTTP endpoint of the node.
    #[clap(long, env)]
    pub rpc_url: Option<Url>,

    /// Websocket endpoint of the node, needed to follow order events.
    #[clap(long, env)]
    pub rpc_url_wss: Option<Url>,

    /// Address of the order processor.
    #[clap(long, env)]
    pub processor: Option<Address>,

    #[clap(long, env)]
    pub asset_token: Option<Address>,

    #[clap(long, env)]
    pub payment_token: Option<Address>,

    /// ABI shape of the processor: 0.1, 0.3 or 0.4.
    #[clap(long, env, default_value = "0.4")]
    pub protocol_version: ProtocolVersion,

    #[clap(long, env, value_enum, default_value = "quote")]
    pub fee_strategy: FeeStrategy,

    #[clap(long, env, default_value = "https://api-enterprise.sandbox.dinari.com")]
    pub fee_api_url: Url,

    #[clap(long, env, hide_env_values = true)]
    pub fee_api_key: Option<String>,

    #[clap(long, env, default_value = "10s", value_parser = humantime::parse_duration)]
    pub fee_api_timeout: Duration,

    #[clap(long, env, value_enum, default_value = "atomic")]
    pub submission_mode: SubmissionMode,

    #[clap(subcommand)]
    pub command: Command,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, clap::ValueEnum, derive_more::Display)]
pub enum FeeStrategy {
    /// Signed quote from the fee service. Only v0.4 processors accept quotes.
    #[display("quote")]
    Quote,
    /// The processor's own fee schedule.
    #[display("standard")]
    Standard,
}

#[derive(clap::Subcommand)]
pub enum Command {
    /// Create an order and optionally follow it until it settles.
    Create(CreateArgs),
    /// Request cancellation of an order.
    Cancel(OrderArgs),
    /// Print the processor's record of an order.
    Status(OrderArgs),
    /// Print processor events as they happen.
    Watch {
        /// Also print events since this block.
        #[clap(long)]
        from_block: Option<u64>,
    },
}

#[derive(clap::Args)]
pub struct CreateArgs {
    #[clap(long)]
    pub sell: bool,

    #[clap(long, default_value = "market")]
    pub order_type: OrderType,

    /// Asset quantity in token units. Required for sells and limit orders.
    #[clap(long)]
    pub asset_quantity: Option<U256>,

    /// Payment quantity in token units. Required for buys.
    #[clap(long)]
    pub payment_quantity: Option<U256>,

    #[clap(long)]
    pub limit_price: Option<U256>,

    /// Expected price in payment token units per whole asset token. Standard
    /// fees of market sells are charged on the proceeds at this price.
    #[clap(long)]
    pub price_estimate: Option<U256>,

    #[clap(long, default_value = "gtc")]
    pub time_in_force: TimeInForce,

    /// Receiver of the proceeds, defaults to the sending account.
    #[clap(long)]
    pub recipient: Option<Address>,

    #[clap(long, requires = "split_amount")]
    pub split_recipient: Option<Address>,

    #[clap(long, requires = "split_recipient")]
    pub split_amount: Option<U256>,

    /// Keep running until the order is fulfilled or cancelled.
    #[clap(long)]
    pub follow: bool,
}

/// Identifies an existing order: by id, by recipient and index on v0.1
/// processors, or by the salted order request on v0.3 processors.
#[derive(clap::Args)]
pub struct OrderArgs {
    #[clap(long)]
    pub order_id: Option<U256>,

    #[clap(long)]
    pub index: Option<U256>,

    /// Defaults to the sending account.
    #[clap(long)]
    pub account: Option<Address>,

    /// Salt the order request was submitted with. The request is made of the
    /// account, the configured tokens, `--quantity-in` and `--price`.
    #[clap(long, requires = "quantity_in")]
    pub salt: Option<B256>,

    #[clap(long, requires = "salt")]
    pub quantity_in: Option<U256>,

    #[clap(long, requires = "salt")]
    pub price: Option<U256>,
}

impl Arguments {
    pub fn required<'a, T>(&self, name: &str, value: Option<&'a T>) -> Result<&'a T, Error> {
        value.ok_or_else(|| Error::Configuration(format!("missing required argument --{name}")))
    }

    pub fn signer(&self) -> Result<PrivateKeySigner, Error> {
        self.required("private-key", self.private_key.as_ref())?
            .trim()
            .parse()
            .map_err(|err| Error::Configuration(format!("invalid private key: {err}")))
    }

    /// Checks combinations that can't be expressed in clap.
    pub fn validate(&self) -> Result<(), Error> {
        if self.fee_strategy == FeeStrategy::Quote && self.protocol_version != ProtocolVersion::V0_4
        {
            return Err(Error::Configuration(format!(
                "v{} processors don't accept fee quotes, use --fee-strategy standard",
                self.protocol_version
            )));
        }
        Ok(())
    }
}

impl CreateArgs {
    pub fn params(&self, args: &Arguments, account: Address) -> Result<OrderParams, Error> {
        let asset_token = *args.required("asset-token", args.asset_token.as_ref())?;
        let payment_token = *args.required("payment-token", args.payment_token.as_ref())?;
        if self.sell || self.order_type == OrderType::Limit {
            args.required("asset-quantity", self.asset_quantity.as_ref())?;
        }
        if !self.sell {
            args.required("payment-quantity", self.payment_quantity.as_ref())?;
        }
        if self.order_type == OrderType::Limit {
            args.required("limit-price", self.limit_price.as_ref())?;
        }
        Ok(OrderParams {
            recipient: self.recipient.unwrap_or(account),
            asset_token,
            payment_token,
            sell: self.sell,
            order_type: self.order_type,
            asset_quantity: self.asset_quantity.unwrap_or_default(),
            payment_quantity: self.payment_quantity.unwrap_or_default(),
            limit_price: self.limit_price.unwrap_or_default(),
            time_in_force: self.time_in_force,
            split: self.split_recipient.zip(self.split_amount),
            price_estimate: self.price_estimate,
        })
    }
}

impl OrderArgs {
    pub fn order_ref(&self, args: &Arguments, account: Address) -> Result<OrderRef, Error> {
        let account = self.account.unwrap_or(account);
        match (args.protocol_version, self.order_id, self.index, self.salt) {
            (ProtocolVersion::V0_1, _, Some(index), _) => Ok(OrderRef::Indexed {
                recipient: account,
                index,
            }),
            (ProtocolVersion::V0_1, ..) => Err(Error::Configuration(
                "v0.1 orders are identified by --index".to_string(),
            )),
            (ProtocolVersion::V0_3, _, _, Some(salt)) => Ok(OrderRef::Salted {
                request: OrderRequest {
                    recipient: account,
                    asset_token: *args.required("asset-token", args.asset_token.as_ref())?,
                    payment_token: *args.required("payment-token", args.payment_token.as_ref())?,
                    quantity_in: self.quantity_in.unwrap_or_default(),
                    price: self.price.unwrap_or_default(),
                },
                salt,
            }),
            (version, _, _, Some(_)) => Err(Error::Configuration(format!(
                "v{version} orders can't be identified by --salt"
            ))),
            (_, Some(id), ..) => Ok(OrderRef::Explicit {
                id: model::OrderId(id),
                account,
            }),
            (_, None, ..) => Err(Error::Configuration(
                "missing required argument --order-id".to_string(),
            )),
        }
    }
}

impl Display for Arguments {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let Self {
            log_filter,
            log_stderr_threshold,
            use_json_logs,
            private_key,
            rpc_url,
            rpc_url_wss,
            processor,
            asset_token,
            payment_token,
            protocol_version,
            fee_strategy,
            fee_api_url,
            fee_api_key,
            fee_api_timeout,
            submission_mode,
            command: _,
        } = self;

        writeln!(f, "log_filter: {log_filter}")?;
        writeln!(f, "log_stderr_threshold: {log_stderr_threshold}")?;
        writeln!(f, "use_json_logs: {use_json_logs}")?;
        display_secret_option(f, "private_key", private_key.as_ref())?;
        // Node urls often embed api keys.
        display_secret_option(f, "rpc_url", rpc_url.as_ref())?;
        display_secret_option(f, "rpc_url_wss", rpc_url_wss.as_ref())?;
        display_option(f, "processor", processor)?;
        display_option(f, "asset_token", asset_token)?;
        display_option(f, "payment_token", payment_token)?;
        writeln!(f, "protocol_version: {protocol_version}")?;
        writeln!(f, "fee_strategy: {fee_strategy}")?;
        writeln!(f, "fee_api_url: {fee_api_url}")?;
        display_secret_option(f, "fee_api_key", fee_api_key.as_ref())?;
        writeln!(f, "fee_api_timeout: {fee_api_timeout:?}")?;
        writeln!(f, "submission_mode: {submission_mode}")?;
        Ok(())
    }
}

fn display_option(f: &mut Formatter<'_>, name: &str, option: &Option<impl Display>) -> fmt::Result {
    match option {
        Some(display) => writeln!(f, "{name}: {display}"),
        None => writeln!(f, "{name}: None"),
    }
}

fn display_secret_option<T>(f: &mut Formatter<'_>, name: &str, option: Option<&T>) -> fmt::Result {
    display_option(f, name, &option.as_ref().map(|_| "SECRET"))
}

#[cfg(test)]
mod tests {
    use {super::*, clap::Parser};

    const KEY: &str = "0x4242424242424242424242424242424242424242424242424242424242424242";

    fn parse(args: &[&str]) -> Arguments {
        Arguments::try_parse_from(std::iter::once("orders").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn display_redacts_secrets() {
        let args = parse(&[
            "--private-key",
            KEY,
            "--fee-api-key",
            "very-secret",
            "--rpc-url",
            "https://node.example/key",
            "status",
            "--order-id",
            "1",
        ]);
        let displayed = args.to_string();
        assert!(!displayed.contains("4242"));
        assert!(!displayed.contains("very-secret"));
        assert!(!displayed.contains("node.example"));
        assert!(displayed.contains("private_key: SECRET"));
        assert!(displayed.contains("processor: None"));
        assert!(displayed.contains("protocol_version: 0.4"));
    }

    #[test]
    fn missing_values_are_configuration_errors() {
        let args = parse(&["watch"]);
        assert!(matches!(args.signer(), Err(Error::Configuration(_))));

        let args = parse(&["--private-key", KEY, "watch"]);
        assert!(args.signer().is_ok());

        let args = parse(&["--protocol-version", "0.3", "watch"]);
        assert!(matches!(args.validate(), Err(Error::Configuration(_))));
        let args = parse(&[
            "--protocol-version",
            "0.3",
            "--fee-strategy",
            "standard",
            "watch",
        ]);
        assert!(args.validate().is_ok());
    }

    #[test]
    fn create_params() {
        let args = parse(&[
            "--asset-token",
            "0x2222222222222222222222222222222222222222",
            "--payment-token",
            "0x3333333333333333333333333333333333333333",
            "create",
            "--payment-quantity",
            "100000000",
        ]);
        let Command::Create(create) = &args.command else {
            panic!("expected create");
        };
        let account = Address::with_last_byte(1);
        let params = create.params(&args, account).unwrap();
        assert_eq!(params.recipient, account);
        assert_eq!(params.payment_quantity, U256::from(100_000_000));
        assert_eq!(params.time_in_force, TimeInForce::Gtc);
        assert!(!params.sell);

        let args = parse(&[
            "--asset-token",
            "0x2222222222222222222222222222222222222222",
            "--payment-token",
            "0x3333333333333333333333333333333333333333",
            "create",
            "--sell",
        ]);
        let Command::Create(create) = &args.command else {
            panic!("expected create");
        };
        assert!(matches!(
            create.params(&args, account),
            Err(Error::Configuration(msg)) if msg.contains("asset-quantity")
        ));
    }

    #[test]
    fn order_refs_per_version() {
        let v01 = parse(&["--protocol-version", "0.1", "watch"]);
        let v04 = parse(&["watch"]);
        let args = OrderArgs {
            order_id: Some(U256::from(7)),
            index: None,
            account: None,
            salt: None,
            quantity_in: None,
            price: None,
        };
        let account = Address::with_last_byte(1);
        assert_eq!(
            args.order_ref(&v04, account).unwrap().id(),
            model::OrderId(U256::from(7))
        );
        assert!(args.order_ref(&v01, account).is_err());

        let args = OrderArgs {
            order_id: None,
            index: Some(U256::from(3)),
            account: None,
            salt: None,
            quantity_in: None,
            price: None,
        };
        assert_eq!(
            args.order_ref(&v01, account).unwrap(),
            OrderRef::Indexed {
                recipient: account,
                index: U256::from(3)
            }
        );
    }

    #[test]
    fn salted_order_refs() {
        let args = parse(&[
            "--protocol-version",
            "0.3",
            "--asset-token",
            "0x2222222222222222222222222222222222222222",
            "--payment-token",
            "0x3333333333333333333333333333333333333333",
            "status",
            "--salt",
            "0x0707070707070707070707070707070707070707070707070707070707070707",
            "--quantity-in",
            "1000",
            "--price",
            "150",
        ]);
        let Command::Status(order) = &args.command else {
            panic!("expected status");
        };
        let account = Address::with_last_byte(1);
        let request = OrderRequest {
            recipient: account,
            asset_token: Address::repeat_byte(0x22),
            payment_token: Address::repeat_byte(0x33),
            quantity_in: U256::from(1_000),
            price: U256::from(150),
        };
        let salt = B256::repeat_byte(7);
        let order_ref = order.order_ref(&args, account).unwrap();
        assert_eq!(order_ref, OrderRef::Salted { request, salt });
        assert_eq!(order_ref.id(), model::OrderId::from_order_request(&request, salt));

        // Other versions don't hash order requests.
        let v04 = parse(&["watch"]);
        assert!(matches!(
            order.order_ref(&v04, account),
            Err(Error::Configuration(msg)) if msg.contains("--salt")
        ));

        // The salt needs the request quantity.
        let salt = salt.to_string();
        assert!(Arguments::try_parse_from(["orders", "status", "--salt", salt.as_str()]).is_err());
    }
}
