//! Bindings for the order processor contracts in each supported ABI shape and
//! for the permit capable ERC20 tokens they escrow.

mod errors;
mod processor_v1;
mod processor_v3;
mod processor_v4;
mod token;

pub use {
    errors::ProcessorErrors,
    processor_v1::OrderProcessorV1,
    processor_v3::OrderProcessorV3,
    processor_v4::OrderProcessorV4,
    token::IERC20Permit,
};

#[macro_export]
macro_rules! bindings {
    ($contract:ident { $($body:tt)* }) => {
        paste::paste! {
            // Generate the main bindings in a private module. That allows
            // us to re-export all items in our own module while also adding
            // some items ourselves.
            #[allow(non_snake_case)]
            mod [<$contract Private>] {
                alloy::sol! {
                    #[allow(missing_docs)]
                    #[sol(rpc)]
                    contract $contract {
                        $($body)*
                    }
                }
            }

            #[allow(non_snake_case)]
            pub mod $contract {
                use alloy::providers::DynProvider;

                pub use super::[<$contract Private>]::*;
                pub type Instance = $contract::[<$contract Instance>]<DynProvider>;
            }
        }
    };
}
