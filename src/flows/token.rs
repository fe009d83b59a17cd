//! NFT workflow with a royalty fee.
//!
//! Steps, each a chain step fed by earlier receipts:
//!
//! | #  | operation                                  | uses        |
//! |----|--------------------------------------------|-------------|
//! | 1  | create account B (10 ℏ)                    |             |
//! | 2  | create account C (10 ℏ)                    |             |
//! | 3  | create NFT collection, 5% royalty          |             |
//! | 4  | mint serials 1 and 2                       | 3           |
//! | 5  | associate B                                | 1, 3        |
//! | 6  | associate C                                | 2, 3        |
//! | 7  | serials 1, 2 operator → B, B pays 5 ℏ      | 1, 3, 4     |
//! | 8  | serial 2 B → C, C pays 5 ℏ                 | 1, 2, 3, 4  |
//! | 9  | royalty raised to 10%                      | 3           |
//! | 10 | serial 2 C → operator, operator pays 5 ℏ   | 2, 3, 4     |
//! | 11 | serial 1 B → C, C pays 5 ℏ                 | 1, 2, 3, 4  |

use crate::chain::{DependencyChain, Receipts};
use crate::flows::{next_receipt, FlowEnv, FlowError};
use crate::keys::{KeyMaterial, KeyRole, Keyring, PrivateKey};
use crate::ledger::amount::Hbar;
use crate::ledger::error::{LedgerError, LedgerResult};
use crate::ledger::ids::{AccountId, TokenId};
use crate::ledger::network::AccountBalance;
use crate::ledger::receipt::Receipt;
use crate::ledger::types::{CustomFee, HbarTransfer, NftTransfer, SupplyType, TokenType};
use crate::transaction::descriptor::OperationDescriptor;
use crate::transaction::fields::{Field, OperationKind};

pub const TOKEN_NAME: &str = "MyNFT";
pub const TOKEN_SYMBOL: &str = "MNFT";
pub const TOKEN_MEMO: &str = "My first NFT";
pub const MAX_SUPPLY: u64 = 5;
pub const METADATA: [&str; 2] = ["firstToken", "SecondToken"];

const ACCOUNT_B: &str = "account-b";
const ACCOUNT_C: &str = "account-c";
const STEP_ACCOUNT_B: usize = 1;
const STEP_ACCOUNT_C: usize = 2;
const STEP_TOKEN: usize = 3;
const STEP_MINT: usize = 4;

/// Hbar every new account starts with, and the price of each NFT sale.
const INITIAL_BALANCE: Hbar = Hbar::new(10);
const SALE_PRICE: Hbar = Hbar::new(5);

/// Keys the token chain signs with.
pub struct TokenKeys {
    /// Owns both B and C, as two signer roles.
    pub accounts: KeyMaterial,
    pub admin: KeyMaterial,
    pub fee_schedule: KeyMaterial,
}

impl TokenKeys {
    pub fn generate() -> Self {
        Self {
            accounts: KeyMaterial::new(KeyRole::owner(ACCOUNT_B), PrivateKey::generate_ed25519()),
            admin: KeyMaterial::generate(KeyRole::Admin),
            fee_schedule: KeyMaterial::generate(KeyRole::FeeSchedule),
        }
    }

    pub fn keyring(&self) -> Keyring {
        Keyring::new()
            .with(self.accounts.clone())
            .with(self.accounts.with_role(KeyRole::owner(ACCOUNT_C)))
            .with(self.admin.clone())
            .with(self.fee_schedule.clone())
    }
}

/// What the token flow produced.
#[derive(Debug, Clone)]
pub struct TokenReport {
    pub account_b: AccountId,
    pub account_c: AccountId,
    pub token_id: TokenId,
    pub receipts: Vec<Receipt>,
}

fn royalty(denominator: u64, collector: AccountId) -> Vec<CustomFee> {
    vec![CustomFee::royalty(1, denominator, collector)]
}

fn create_account(key: &KeyMaterial) -> impl Fn(&Receipts<'_>) -> LedgerResult<OperationDescriptor> {
    let public_key = key.public_key();
    move |_| {
        OperationKind::AccountCreate
            .builder()
            .set(Field::Key, public_key)
            .set(Field::InitialBalance, INITIAL_BALANCE)
            .signer(KeyRole::Operator)
            .build()
    }
}

fn associate(account_step: usize, owner: &'static str) -> impl Fn(&Receipts<'_>) -> LedgerResult<OperationDescriptor> {
    move |receipts| {
        OperationKind::TokenAssociate
            .builder()
            .set(Field::AccountId, receipts.account_id(account_step)?)
            .set(Field::TokenIds, vec![receipts.token_id(STEP_TOKEN)?])
            .signer(KeyRole::owner(owner))
            .build()
    }
}

/// Where an NFT sale's parties come from: a chain step or the operator.
#[derive(Clone, Copy)]
enum Party {
    Step(usize),
    Operator(AccountId),
}

impl Party {
    fn resolve(self, receipts: &Receipts<'_>) -> LedgerResult<AccountId> {
        match self {
            Party::Step(step) => receipts.account_id(step),
            Party::Operator(id) => Ok(id),
        }
    }
}

/// Move `serials` from `seller` to `buyer`, the buyer paying the sale price.
fn sale(
    serials: &'static [u64],
    seller: Party,
    buyer: Party,
    signers: &'static [&'static str],
) -> impl Fn(&Receipts<'_>) -> LedgerResult<OperationDescriptor> {
    move |receipts| {
        let token_id = receipts.token_id(STEP_TOKEN)?;
        let minted = receipts.serials(STEP_MINT)?;
        let seller = seller.resolve(receipts)?;
        let buyer = buyer.resolve(receipts)?;

        if let Some(missing) = serials.iter().find(|serial| !minted.contains(*serial)) {
            tracing::warn!(serial = missing, "Serial was not minted");
            return Err(LedgerError::UnresolvedDependency {
                step: STEP_MINT,
                wanted: "minted serials",
            });
        }
        let nfts = serials
            .iter()
            .map(|serial| NftTransfer::new(token_id, *serial, seller, buyer))
            .collect::<Vec<_>>();
        let hbar = vec![
            HbarTransfer {
                account_id: seller,
                amount: SALE_PRICE,
            },
            HbarTransfer {
                account_id: buyer,
                amount: -SALE_PRICE,
            },
        ];
        OperationKind::Transfer
            .builder()
            .set(Field::NftTransfers, nfts)
            .set(Field::HbarTransfers, hbar)
            .signers(signers.iter().map(|label| KeyRole::owner(*label)))
            .build()
    }
}

/// The whole workflow as one chain. `operator` collects the royalty and
/// holds the treasury.
pub fn token_chain(operator: AccountId, operator_key: &KeyMaterial, keys: &TokenKeys) -> DependencyChain {
    let supply_key = operator_key.public_key();
    let admin_key = keys.admin.public_key();
    let fee_schedule_key = keys.fee_schedule.public_key();

    DependencyChain::new()
        .step("create account B", create_account(&keys.accounts))
        .step("create account C", create_account(&keys.accounts))
        .step("create NFT collection", move |_| {
            OperationKind::TokenCreate
                .builder()
                .set(Field::TokenName, TOKEN_NAME)
                .set(Field::TokenSymbol, TOKEN_SYMBOL)
                .set(Field::TokenMemo, TOKEN_MEMO)
                .set(Field::TokenType, TokenType::NonFungibleUnique)
                .set(Field::MaxTransactionFee, Hbar::new(100))
                .set(Field::InitialSupply, 0u64)
                .set(Field::Treasury, operator)
                .set(Field::SupplyType, SupplyType::Finite)
                .set(Field::MaxSupply, MAX_SUPPLY)
                .set(Field::SupplyKey, supply_key)
                .set(Field::CustomFees, royalty(20, operator))
                .set(Field::FeeScheduleKey, fee_schedule_key)
                .set(Field::AdminKey, admin_key)
                .signer(KeyRole::Admin)
                .build()
        })
        .step("mint NFTs", |receipts| {
            OperationKind::TokenMint
                .builder()
                .set(Field::TokenId, receipts.token_id(STEP_TOKEN)?)
                .set(
                    Field::Metadata,
                    METADATA.iter().map(|m| m.as_bytes().to_vec()).collect::<Vec<_>>(),
                )
                .signer(KeyRole::Operator)
                .build()
        })
        .step("associate account B", associate(STEP_ACCOUNT_B, ACCOUNT_B))
        .step("associate account C", associate(STEP_ACCOUNT_C, ACCOUNT_C))
        .step(
            "transfer serials 1 and 2 to B",
            sale(&[1, 2], Party::Operator(operator), Party::Step(STEP_ACCOUNT_B), &[ACCOUNT_B]),
        )
        .step(
            "transfer serial 2 from B to C",
            sale(&[2], Party::Step(STEP_ACCOUNT_B), Party::Step(STEP_ACCOUNT_C), &[ACCOUNT_B, ACCOUNT_C]),
        )
        .step("raise royalty to 10%", move |receipts| {
            OperationKind::TokenFeeScheduleUpdate
                .builder()
                .set(Field::TokenId, receipts.token_id(STEP_TOKEN)?)
                .set(Field::CustomFees, royalty(10, operator))
                .signer(KeyRole::FeeSchedule)
                .build()
        })
        .step(
            "transfer serial 2 from C to operator",
            sale(&[2], Party::Step(STEP_ACCOUNT_C), Party::Operator(operator), &[ACCOUNT_C]),
        )
        .step(
            "transfer serial 1 from B to C",
            sale(&[1], Party::Step(STEP_ACCOUNT_B), Party::Step(STEP_ACCOUNT_C), &[ACCOUNT_B, ACCOUNT_C]),
        )
}

/// Steps after which balances are printed.
const PRINT_AFTER: &[usize] = &[1, 2, 3, 4, 6, 7, 8, 10, 11];

pub async fn run(env: &FlowEnv) -> Result<TokenReport, FlowError> {
    let operator = env.ctx.operator_account();
    let keys = TokenKeys::generate();
    let chain = token_chain(operator, env.ctx.operator_key(), &keys);
    let keyring = keys.keyring();
    let labels: Vec<String> = chain.labels().map(str::to_owned).collect();

    println!("---------------------Create Accounts---------------------");
    let AccountBalance { hbars, .. } = env.balance(operator).await.map_err(FlowError::ledger("balance query"))?;
    println!("The hbar account balance for operator account is {}", hbars);

    let mut run = chain.start(&env.client, &keyring, &env.ctx, env.receipt_timeout);
    let mut account_b = None;
    let mut account_c = None;
    let mut token_id = None;

    while !run.is_finished() {
        let step = run.next_step();
        let receipt = next_receipt(&mut run).await?;
        let label = &labels[step - 1];
        println!("{} (step {}) status: {}", label, step, receipt.status);

        match step {
            STEP_ACCOUNT_B => account_b = receipt.account_id(),
            STEP_ACCOUNT_C => account_c = receipt.account_id(),
            STEP_TOKEN => token_id = receipt.token_id(),
            _ => {}
        }
        if let Some(assigned) = &receipt.assigned {
            println!("Created {}", assigned);
        }
        if !receipt.serials.is_empty() {
            println!("Minted serials {:?}", receipt.serials);
        }

        if PRINT_AFTER.contains(&step) {
            let mut accounts = vec![("operator", operator)];
            accounts.extend(account_b.map(|id| ("account B", id)));
            accounts.extend(account_c.map(|id| ("account C", id)));
            env.print_balances(&accounts, token_id).await?;
        }
    }

    let (Some(account_b), Some(account_c), Some(token_id)) = (account_b, account_c, token_id) else {
        return Err(FlowError::Ledger {
            what: "token flow",
            source: LedgerError::UnresolvedDependency {
                step: STEP_TOKEN,
                wanted: "account and token ids",
            },
        });
    };
    Ok(TokenReport {
        account_b,
        account_c,
        token_id,
        receipts: run.into_outcome().receipts().to_vec(),
    })
}
