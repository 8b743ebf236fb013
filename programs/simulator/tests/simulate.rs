//! Runs simulations end to end from config files

use std::{io::Write, path::Path};

use alloy_primitives::U256;
use ibc_eureka_ics20::denom::voucher_denom;
use ibc_eureka_simulator::{
    config::{GenesisBalance, Side, SimulatorConfig},
    scenario::{run, BalanceReport, Outcome, Report, TransferReport},
};

fn example_config() -> SimulatorConfig {
    let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("config.example.json");
    SimulatorConfig::from_file(path).unwrap()
}

fn balance(report: &Report, chain: &str, account: &str, denom: &str) -> Option<U256> {
    report
        .balances
        .iter()
        .find(|b| b.chain == chain && b.account == account && b.denom == denom)
        .map(|b| b.amount)
}

#[test]
fn example_config_runs() {
    let report = run(&example_config()).unwrap();

    assert_eq!(
        report.transfers,
        vec![
            TransferReport {
                from: Side::A,
                sequence: 1,
                outcome: Outcome::Acknowledged,
            },
            TransferReport {
                from: Side::B,
                sequence: 1,
                outcome: Outcome::TimedOut,
            },
            TransferReport {
                from: Side::B,
                sequence: 2,
                outcome: Outcome::Acknowledged,
            },
        ]
    );

    let voucher = voucher_denom("transfer/chanB/uatom");
    assert_eq!(balance(&report, "chain-a", "alice", "uatom"), Some(U256::from(900_u64)));
    // the voucher went home and was unescrowed for carol
    assert_eq!(balance(&report, "chain-a", "carol", "uatom"), Some(U256::from(30_u64)));
    assert_eq!(balance(&report, "chain-b", "bob", &voucher), Some(U256::from(70_u64)));
    // refunded after the timeout
    assert_eq!(balance(&report, "chain-b", "bob", "uosmo"), Some(U256::from(500_u64)));

    let bob_voucher = report
        .balances
        .iter()
        .find(|b| b.denom == voucher)
        .unwrap();
    assert_eq!(
        bob_voucher,
        &BalanceReport {
            chain: "chain-b".to_string(),
            account: "bob".to_string(),
            denom: voucher.clone(),
            trace: "transfer/chanB/uatom".to_string(),
            amount: U256::from(70_u64),
        }
    );
}

#[test]
fn report_serializes_amounts_as_strings() {
    let report = run(&example_config()).unwrap();
    let json = serde_json::to_value(&report).unwrap();
    assert_eq!(json["transfers"][1]["outcome"], "timed_out");
    assert_eq!(json["transfers"][1]["from"], "b");
    assert_eq!(json["balances"][0]["amount"], "900");
}

#[test]
fn trace_shaped_genesis_denom_is_rejected() {
    let mut config = example_config();
    // would be unescrowed on chain-b as if it were returning home
    config.balances.push(GenesisBalance {
        chain: Side::A,
        account: "mallory".to_string(),
        denom: "transfer/chanA/uosmo".to_string(),
        amount: U256::from(5_u64),
    });

    let err = run(&config).unwrap_err();
    assert!(
        err.to_string().starts_with("config error at balances[2].denom"),
        "{err}"
    );
}

#[test]
fn overdrawn_transfer_fails_the_run() {
    let mut config = example_config();
    config.transfers.truncate(1);
    config.transfers[0].amount = U256::from(1_001_u64);

    let err = run(&config).unwrap_err();
    assert_eq!(err.to_string(), "transfer 0 failed");
}

#[test]
fn invalid_chain_is_reported_from_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(
        br#"{
            "chain_a": { "chain_id": "chain-a", "genesis_time": 1700000000 },
            "chain_b": { "chain_id": "chain-b", "genesis_time": 1700000000, "validator_seeds": [] }
        }"#,
    )
    .unwrap();

    let config = SimulatorConfig::from_file(file.path()).unwrap();
    let err = run(&config).unwrap_err();
    assert_eq!(err.to_string(), "invalid chain_b");
    assert_eq!(err.root_cause().to_string(), "no validators");
}
