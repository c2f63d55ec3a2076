//! Integration tests for the interval driver with stand-in solvers.

mod common;

use common::{BrokenBackend, ConstraintBreaker, IdleSolver, ScriptedSolver};
use smooth_sim::components::compressor_h2::specific_compression_energy;
use smooth_sim::error::SimError;
use smooth_sim::io::export;
use smooth_sim::network::EntityKind;
use smooth_sim::network::solver::SolveStatus;
use smooth_sim::sim::engine::{Phase, Simulation};

const TANK: &str = r#"
busses = ["bh2"]

[sim_params]
n_intervals = 3
interval_time = 60

[[components]]
component = "storage_h2"
name = "tank"
bus_in = "bh2"
bus_out = "bh2"
storage_capacity = 500.0
initial_storage_factor = 0.5
"#;

const BATTERY: &str = r#"
busses = ["bel"]

[sim_params]
n_intervals = 2
interval_time = 60

[[components]]
component = "battery"
name = "battery"
bus_in_and_out = "bel"
battery_capacity = 10000.0
soc_init = 1.0
soc_min = 0.1
loss_rate = 12.0
"#;

const COMPRESSION: &str = r#"
busses = ["bh2_lp", "bh2_hp", "bel"]

[sim_params]
n_intervals = 1
interval_time = 60

[[components]]
component = "storage_h2"
name = "tank"
bus_in = "bh2_hp"
bus_out = "bh2_hp"
storage_capacity = 500.0

[[components]]
component = "compressor_h2"
name = "compressor"
bus_h2_in = "bh2_lp"
bus_h2_out = "bh2_hp"
bus_el = "bel"
foreign_states = [30.0, { component = "tank", attribute = "pressure" }]
"#;

const CHP: &str = r#"
busses = ["bh2", "bel", "bth"]

[sim_params]
n_intervals = 2
interval_time = 60

[[components]]
component = "h2_chp"
name = "chp"
bus_h2 = "bh2"
bus_el = "bel"
bus_th = "bth"
power_max = 100000.0
"#;

#[test]
fn idle_storage_keeps_its_level() {
    let system = common::system_from_toml(TANK);
    let system = Simulation::new(system, IdleSolver::default())
        .unwrap()
        .run()
        .unwrap();

    let tank = system.component("tank").unwrap();
    let levels = tank.base().states.named("storage_level").unwrap();
    assert_eq!(levels, &[Some(250.0); 3]);
    assert_eq!(tank.attribute("storage_level"), Some(250.0));
    assert!(tank.base().summary.is_some());
}

#[test]
fn battery_self_discharge_per_interval() {
    let system = common::system_from_toml(BATTERY);
    let system = Simulation::new(system, IdleSolver::default())
        .unwrap()
        .run()
        .unwrap();

    let soc = system
        .component("battery")
        .unwrap()
        .base()
        .states
        .named("soc")
        .unwrap()
        .to_vec();
    assert_eq!(soc, vec![Some(0.5), Some(0.25)]);
}

#[test]
fn battery_at_half_charge_is_unchanged_without_loss() {
    let system = common::system_from_toml(
        r#"
busses = ["bel", "bh2"]

[sim_params]
n_intervals = 1
interval_time = 60

[[components]]
component = "battery"
name = "battery"
bus_in_and_out = "bel"
battery_capacity = 10000.0
soc_init = 0.5
loss_rate = 0.0
"#,
    );
    let system = Simulation::new(system, IdleSolver::default())
        .unwrap()
        .run()
        .unwrap();

    let battery = system.component("battery").unwrap();
    assert_eq!(battery.base().states.named("soc").unwrap(), &[Some(0.5)]);
    assert_eq!(battery.attribute("soc"), Some(0.5));
}

#[test]
fn compressor_reads_storage_pressure() {
    let system = common::system_from_toml(COMPRESSION);
    let tank_pressure = system
        .component("tank")
        .and_then(|c| c.attribute("pressure"))
        .unwrap();
    let expected = specific_compression_energy(30.0, tank_pressure, 293.15, 0.88829);
    assert!(expected > 0.0);

    let mut sim = Simulation::new(system, IdleSolver::default()).unwrap();
    sim.prepare().unwrap();
    let compressor = sim.system().component("compressor").unwrap();
    assert_eq!(compressor.attribute("spec_compression_energy"), Some(expected));

    sim.build_model().unwrap();
    let network = sim.network().unwrap();
    match &network.entity("compressor").unwrap().kind {
        EntityKind::Transformer { conversion_factors } => {
            assert_eq!(conversion_factors.get("bel"), Some(&expected));
        }
        other => panic!("unexpected entity kind: {other:?}"),
    }
}

#[test]
fn phases_out_of_order_are_rejected() {
    let system = common::system_from_toml(TANK);
    let mut sim = Simulation::new(system, IdleSolver::default()).unwrap();

    let err = sim.solve().unwrap_err();
    assert!(matches!(
        err,
        SimError::Lifecycle {
            expected: Phase::Modeled,
            found: Phase::Idle
        }
    ));
    assert!(matches!(sim.update(), Err(SimError::Lifecycle { .. })));
    assert_eq!(sim.phase(), Phase::Idle);

    sim.prepare().unwrap();
    assert_eq!(sim.phase(), Phase::Prepared);
    assert_eq!(sim.interval(), Some(0));
    let err = sim.prepare().unwrap_err();
    assert!(matches!(
        err,
        SimError::Lifecycle {
            found: Phase::Prepared,
            ..
        }
    ));
    assert_eq!(sim.interval(), Some(0));
}

#[test]
fn stepping_past_the_last_interval() {
    let system = common::system_from_toml(BATTERY);
    let mut sim = Simulation::new(system, IdleSolver::default()).unwrap();

    assert!(sim.step().unwrap());
    assert_eq!(sim.phase(), Phase::Updated);
    assert!(sim.step().unwrap());
    assert_eq!(sim.phase(), Phase::Finished);
    assert!(!sim.step().unwrap());

    let err = sim.prepare().unwrap_err();
    assert!(matches!(
        err,
        SimError::Lifecycle {
            found: Phase::Finished,
            ..
        }
    ));
}

#[test]
fn infeasible_interval_halts_the_run() {
    let system = common::system_from_toml(TANK);
    let solver = ScriptedSolver {
        statuses: vec![SolveStatus::Optimal, SolveStatus::Infeasible],
    };
    let mut sim = Simulation::new(system, solver).unwrap();

    assert!(sim.step().unwrap());
    let err = sim.step().unwrap_err();
    assert!(matches!(
        err,
        SimError::Infeasible {
            interval: 1,
            status: SolveStatus::Infeasible
        }
    ));
    assert_eq!(sim.phase(), Phase::Modeled);

    let levels = sim
        .system()
        .component("tank")
        .unwrap()
        .base()
        .states
        .named("storage_level")
        .unwrap()
        .to_vec();
    assert_eq!(levels, vec![Some(250.0), None, None]);
}

#[test]
fn run_stops_on_unbounded() {
    let system = common::system_from_toml(TANK);
    let solver = ScriptedSolver {
        statuses: vec![SolveStatus::Unbounded],
    };
    let err = Simulation::new(system, solver).unwrap().run().unwrap_err();
    assert!(matches!(err, SimError::Infeasible { interval: 0, .. }));
}

#[test]
fn backend_failure_is_reported_with_interval() {
    let system = common::system_from_toml(TANK);
    let err = Simulation::new(system, BrokenBackend)
        .unwrap()
        .run()
        .unwrap_err();
    match err {
        SimError::Solver { interval, source } => {
            assert_eq!(interval, 0);
            assert!(source.message.contains("license"));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn chp_branches_share_the_hydrogen_input() {
    let system = common::system_from_toml(CHP);
    let system = Simulation::new(system, IdleSolver::default())
        .unwrap()
        .run()
        .unwrap();
    let chp = system.component("chp").unwrap();
    assert_eq!(chp.base().flow("bh2", "chp_electric", 1), Some(0.0));
    assert_eq!(chp.base().flow("bh2", "chp_thermal", 1), Some(0.0));
}

#[test]
fn unequal_chp_branches_are_detected() {
    let system = common::system_from_toml(CHP);
    let mut sim = Simulation::new(system, ConstraintBreaker { value: 1.0 }).unwrap();
    sim.prepare().unwrap();
    sim.build_model().unwrap();

    match sim.solve().unwrap_err() {
        SimError::CouplingViolated {
            constraint,
            interval,
            left,
            right,
        } => {
            assert_eq!(constraint, "chp_flow_ratio_fix_chp");
            assert_eq!(interval, 0);
            assert_eq!((left, right), (1.0, 0.0));
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(sim.phase(), Phase::Modeled);
}

#[test]
fn demand_profile_costs_and_export() {
    let dir = tempfile::tempdir().unwrap();
    common::write_profile(dir.path(), "demand.csv", &[1.0, 2.0, 3.0]);
    let model = format!(
        r#"
busses = ["bel"]

[sim_params]
n_intervals = 3
interval_time = 60

[[components]]
component = "supply"
name = "grid"
bus_out = "bel"

[[components]]
component = "energy_demand_from_csv"
name = "demand"
bus_in = "bel"
nominal_value = 1000.0
csv_filename = "demand.csv"
path = "{}"

[components.accounting]
variable_costs = 0.5
dependency_flow_costs = ["bel", "demand"]
variable_emissions = 2.0
dependency_flow_emissions = ["bel", "demand"]
"#,
        dir.path().display()
    );
    let system = common::system_from_toml(&model);
    let system = Simulation::new(system, IdleSolver::default())
        .unwrap()
        .run()
        .unwrap();

    let demand = system.component("demand").unwrap();
    assert_eq!(demand.base().flow("bel", "demand", 2), Some(3000.0));
    let summary = demand.base().summary.as_ref().unwrap();
    assert_eq!(summary.variable_costs_total, 3000.0);
    assert_eq!(summary.variable_emissions_total, 12000.0);

    let csv_path = dir.path().join("results.csv");
    export::export_csv(&system, &csv_path).unwrap();
    let mut rdr = csv::Reader::from_path(&csv_path).unwrap();
    let rows: Vec<csv::StringRecord> = rdr.records().map(Result::unwrap).collect();
    assert!(rows.iter().any(|r| {
        r.iter().collect::<Vec<_>>() == ["demand", "variable_costs", "1", "1000"]
    }));

    let json_path = dir.path().join("summaries.json");
    export::export_summaries_json(&system, &json_path).unwrap();
    let json: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&json_path).unwrap()).unwrap();
    assert_eq!(json["demand"]["variable_emissions_total"], 12000.0);
    assert_eq!(json["grid"]["variable_costs_total"], 0.0);
}
