
use cli_helpers::{base_cmd, db_path, decimal, run_json, write_config};
use assert_cmd::prelude::*;
use predicates::prelude::*;
use rust_decimal_macros::dec;
use tempfile::TempDir;

fn setup_temp_home() -> TempDir {
    TempDir::new().expect("failed to create temp home")
}

#[test]
fn simulate_with_manual_rate_json() {
    let home = setup_temp_home();

    let result = run_json(
        &home,
        &[
            "simulate",
            "--value",
            "100",
            "--quantity",
            "100",
            "--transport",
            "air",
            "--date",
            "2026-10-10",
            "--manual-rate",
            "1",
            "--offline",
        ],
    )
    .unwrap();

    assert_eq!(decimal(&result["cif_base"]), dec!(10000));
    assert_eq!(decimal(&result["tax_breakdown"]["ii"]), dec!(1600));
    assert_eq!(decimal(&result["tax_breakdown"]["afrmm"]), dec!(0));
    assert_eq!(decimal(&result["tax_breakdown"]["total"]), dec!(5575));
    // Default Siscomex fee
    assert_eq!(decimal(&result["expenses_total"]), dec!(154.23));
    assert_eq!(decimal(&result["total_cost"]), dec!(15729.23));
    assert_eq!(result["rate_info"]["source"], "manual");
}

#[test]
fn simulate_table_without_color() {
    let home = setup_temp_home();

    base_cmd(&home)
        .arg("--no-color")
        .args([
            "simulate",
            "--value",
            "100",
            "--quantity",
            "100",
            "--transport",
            "air",
            "--manual-rate",
            "1",
            "--offline",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("Importação comum (COMUM)"))
        .stdout(predicate::str::contains("R$ 5.575,00"))
        .stdout(predicate::str::contains("Total landed cost"))
        .stdout(predicate::str::contains("R$ 15.729,23"))
        .stdout(predicate::str::contains("\u{001b}[").not());
}

#[test]
fn brl_drawback_needs_no_quote() {
    let home = setup_temp_home();

    let result = run_json(
        &home,
        &[
            "simulate",
            "--currency",
            "brl",
            "--value",
            "2500",
            "--quantity",
            "4",
            "--freight",
            "800",
            "--regime",
            "drawback",
            "--offline",
        ],
    )
    .unwrap();

    assert_eq!(result["rate_info"]["source"], "identity");
    assert_eq!(decimal(&result["tax_breakdown"]["total"]), dec!(0));
    assert_eq!(result["license_required"], true);
    assert_eq!(decimal(&result["total_cost"]), dec!(10954.23));
}

#[test]
fn zona_franca_and_extra_expenses() {
    let home = setup_temp_home();

    let result = run_json(
        &home,
        &[
            "simulate",
            "--value",
            "1000",
            "--quantity",
            "10",
            "--manual-rate",
            "1",
            "--transport",
            "road",
            "--dest",
            "am",
            "--expense",
            "Armazenagem=345,77",
            "--offline",
        ],
    )
    .unwrap();

    assert_eq!(result["incentives_applied"][0]["id"], "zfm");
    assert_eq!(decimal(&result["incentive_savings"]), dec!(4008));
    assert_eq!(decimal(&result["expenses_total"]), dec!(500));
    assert_eq!(decimal(&result["total_cost"]), dec!(12067));
}

#[test]
fn future_date_fails_with_manual_rate_hint() {
    let home = setup_temp_home();

    base_cmd(&home)
        .arg("--no-color")
        .args(["simulate", "--value", "100", "--date", "2999-01-01", "--offline"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("is after today"))
        .stderr(predicate::str::contains("--manual-rate"));
}

#[test]
fn offline_without_cache_reports_no_quote() {
    let home = setup_temp_home();

    base_cmd(&home)
        .arg("--no-color")
        .args(["rate", "EUR", "--date", "2026-10-09", "--offline"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("no EUR quote found"))
        .stderr(predicate::str::contains("rate-override set EUR"));
}

#[test]
fn invalid_inputs_are_rejected() {
    let home = setup_temp_home();

    base_cmd(&home)
        .args(["simulate", "--value=-100", "--manual-rate", "1", "--offline"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid value for product_value: -100"));

    base_cmd(&home)
        .args(["simulate", "--value", "100", "--regime", "xpto", "--manual-rate", "1", "--offline"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown customs regime: xpto"));
}

#[test]
fn amounts_beyond_decimal_range_fail_cleanly() {
    let home = setup_temp_home();

    base_cmd(&home)
        .args([
            "simulate",
            "--value",
            "79228162514264337593543950335",
            "--quantity",
            "2",
            "--manual-rate",
            "1",
            "--offline",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid value for product_value"))
        .stderr(predicate::str::contains("panicked").not());
}

#[test]
fn retained_rate_override_is_used_until_cleared() {
    let home = setup_temp_home();

    base_cmd(&home)
        .args(["--no-color", "rate-override", "set", "usd", "5,10"])
        .assert()
        .success()
        .stdout(predicate::str::contains("USD will use R$ 5,1000"));

    let quote = run_json(&home, &["rate", "USD", "--date", "2026-10-10", "--offline"]).unwrap();
    assert_eq!(decimal(&quote["rate"]), dec!(5.10));
    assert_eq!(quote["source"], "manual");

    let listed = run_json(&home, &["rate-override", "list"]).unwrap();
    assert_eq!(listed.as_array().map(Vec::len), Some(1));
    assert_eq!(listed[0]["currency"], "USD");

    let cleared = run_json(&home, &["rate-override", "clear", "USD"]).unwrap();
    assert_eq!(cleared["removed"], true);

    base_cmd(&home)
        .args(["rate", "USD", "--date", "2026-10-10", "--offline"])
        .assert()
        .failure();

    assert!(db_path(&home).exists());
}

#[test]
fn sessions_are_saved_listed_and_deleted() {
    let home = setup_temp_home();

    base_cmd(&home)
        .args([
            "--no-color",
            "simulate",
            "--value",
            "50",
            "--quantity",
            "20",
            "--manual-rate",
            "5",
            "--session",
            "lote-1",
            "--offline",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("Saved as session lote-1"));

    base_cmd(&home)
        .args(["--no-color", "session", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("lote-1"))
        .stdout(predicate::str::contains("COMUM"));

    let shown = run_json(&home, &["session", "show", "lote-1"]).unwrap();
    assert_eq!(shown["id"], "lote-1");
    assert_eq!(decimal(&shown["inputs"]["quantity"]), dec!(20));
    assert_eq!(decimal(&shown["result"]["cif_base"]), dec!(5000));

    base_cmd(&home)
        .args(["session", "delete", "lote-1"])
        .assert()
        .success();

    base_cmd(&home)
        .args(["session", "show", "lote-1"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Session 'lote-1' not found"));
}

#[test]
fn regimes_and_incentives_include_configured_entries() {
    let home = setup_temp_home();
    write_config(
        &home,
        r#"
[[regimes]]
code = "ENTREPOSTO"
name = "Entreposto aduaneiro"
method = "temporary"
requires_license = true

[[incentives]]
id = "fundap"
name = "FUNDAP"
scope = "regional"
applicability = { dest_states = ["ES"] }
reductions = { icms = "0.25" }
"#,
    );

    base_cmd(&home)
        .args(["--no-color", "regimes"])
        .assert()
        .success()
        .stdout(predicate::str::contains("ADMISSAO_TEMPORARIA"))
        .stdout(predicate::str::contains("ENTREPOSTO"))
        .stdout(predicate::str::contains("\u{001b}[").not());

    let incentives = run_json(&home, &["incentives"]).unwrap();
    let ids: Vec<&str> = incentives
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|i| i["id"].as_str())
        .collect();
    assert_eq!(ids, vec!["zfm", "ttd409", "compete-es", "lei-informatica", "fundap"]);
}

#[test]
fn broken_config_is_reported() {
    let home = setup_temp_home();
    write_config(&home, "[exchange]\nmax_lookback_days = 0\n");

    base_cmd(&home)
        .arg("regimes")
        .assert()
        .failure()
        .stderr(predicate::str::contains("max_lookback_days"));
}
