//! Devices with several non-linear outputs sharing one input.
//!
//! A piecewise-linear entity only supports a single output, so a device such
//! as a CHP unit is modelled as one branch per output. Each branch sees `1/n`
//! of the shared input, and the branches' input flows are tied together by
//! equality constraints.

use crate::piecewise::PiecewiseCurve;

use super::{Entity, EntityKind, EqualityConstraint, Flow};

/// One output branch of a split device.
#[derive(Debug, Clone, PartialEq)]
pub struct SplitBranch {
    /// Appended to the device name to form the entity label.
    pub suffix: String,
    pub output_bus: String,
    /// Full-device curve: total input breakpoints to this branch's output.
    pub curve: PiecewiseCurve,
}

impl SplitBranch {
    pub fn new(suffix: impl Into<String>, output_bus: impl Into<String>, curve: PiecewiseCurve) -> Self {
        Self {
            suffix: suffix.into(),
            output_bus: output_bus.into(),
            curve,
        }
    }
}

/// A logical device expanded into coupled piecewise-linear branches.
#[derive(Debug, Clone, PartialEq)]
pub struct SplitDevice {
    pub name: String,
    /// Prefix of the coupling constraint names.
    pub constraint_prefix: String,
    pub input_bus: String,
    /// Cost coefficient put on the first branch's input flow.
    pub input_costs: f64,
    pub branches: Vec<SplitBranch>,
}

impl SplitDevice {
    pub fn new(
        name: impl Into<String>,
        constraint_prefix: impl Into<String>,
        input_bus: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            constraint_prefix: constraint_prefix.into(),
            input_bus: input_bus.into(),
            input_costs: 0.0,
            branches: Vec::new(),
        }
    }

    pub fn branch(mut self, branch: SplitBranch) -> Self {
        self.branches.push(branch);
        self
    }

    pub fn input_costs(mut self, costs: f64) -> Self {
        self.input_costs = costs;
        self
    }

    /// Entity label of every branch.
    pub fn labels(&self) -> Vec<String> {
        self.branches
            .iter()
            .map(|b| branch_label(&self.name, &b.suffix))
            .collect()
    }

    /// Name of the `k`-th coupling constraint (`k >= 1`), derived from the
    /// whitespace-free device name.
    pub fn constraint_name(&self, k: usize) -> String {
        let sanitized: String = self.name.chars().filter(|c| !c.is_whitespace()).collect();
        if k <= 1 {
            format!("{}_{sanitized}", self.constraint_prefix)
        } else {
            format!("{}_{sanitized}_{k}", self.constraint_prefix)
        }
    }

    /// Input breakpoints seen by a single branch.
    pub fn branch_input_breakpoints(&self, branch: &SplitBranch) -> Vec<f64> {
        let share = 1.0 / self.branches.len().max(1) as f64;
        branch.curve.scale_input(share).input
    }

    pub(crate) fn into_parts(self) -> (Vec<Entity>, Vec<EqualityConstraint>) {
        let labels = self.labels();
        let mut entities = Vec::with_capacity(self.branches.len());
        for (k, (branch, label)) in self.branches.iter().zip(&labels).enumerate() {
            let in_breakpoints = self.branch_input_breakpoints(branch);
            let nominal = in_breakpoints.last().copied().unwrap_or(0.0);
            let costs = if k == 0 { self.input_costs } else { 0.0 };
            let entity = Entity::new(
                label.clone(),
                EntityKind::PiecewiseTransformer {
                    in_breakpoints,
                    out_breakpoints: branch.curve.output.clone(),
                },
            )
            .input(self.input_bus.clone(), Flow::new().nominal(nominal).costs(costs))
            .output(branch.output_bus.clone(), Flow::new());
            entities.push(entity);
        }

        let constraints = labels
            .iter()
            .enumerate()
            .skip(1)
            .map(|(k, label)| EqualityConstraint {
                name: self.constraint_name(k),
                flows: [
                    (self.input_bus.clone(), labels[0].clone()),
                    (self.input_bus.clone(), label.clone()),
                ],
            })
            .collect();

        (entities, constraints)
    }
}

fn branch_label(name: &str, suffix: &str) -> String {
    format!("{name}_{suffix}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::FlowNetwork;

    fn curve() -> PiecewiseCurve {
        PiecewiseCurve::new(vec![0.0, 4.0, 8.0], vec![0.0, 30.0, 50.0])
    }

    fn device() -> SplitDevice {
        SplitDevice::new("my chp", "chp_flow_ratio_fix", "bus_h2")
            .branch(SplitBranch::new("electric", "bus_el", curve()))
            .branch(SplitBranch::new("thermal", "bus_th", curve()))
    }

    #[test]
    fn two_branches_get_half_the_input() {
        let dev = device();
        let branch = &dev.branches[0];
        assert_eq!(dev.branch_input_breakpoints(branch), vec![0.0, 2.0, 4.0]);
    }

    #[test]
    fn coupling_constraint_uses_sanitized_name() {
        let (entities, constraints) = device().into_parts();
        assert_eq!(entities.len(), 2);
        assert_eq!(constraints.len(), 1);
        assert_eq!(constraints[0].name, "chp_flow_ratio_fix_mychp");
        assert_eq!(
            constraints[0].flows,
            [
                ("bus_h2".to_string(), "my chp_electric".to_string()),
                ("bus_h2".to_string(), "my chp_thermal".to_string()),
            ]
        );
    }

    #[test]
    fn add_split_is_all_or_nothing() {
        let mut net = FlowNetwork::new(["bus_h2", "bus_el"]);
        let err = net.add_split(device());
        assert!(err.is_err());
        assert!(net.entities().is_empty());
        assert!(net.constraints().is_empty());

        let mut net = FlowNetwork::new(["bus_h2", "bus_el", "bus_th"]);
        net.add_split(device()).unwrap();
        assert_eq!(net.entities().len(), 2);
        assert_eq!(net.constraints().len(), 1);
        let el = net.entity("my chp_electric").unwrap();
        assert_eq!(el.inputs["bus_h2"].nominal_value, Some(4.0));
    }

    #[test]
    fn three_branches_chain_to_first() {
        let dev = device().branch(SplitBranch::new("cold", "bus_el", curve()));
        assert_eq!(dev.branch_input_breakpoints(&dev.branches[2])[2], 8.0 / 3.0);
        let (_, constraints) = dev.into_parts();
        assert_eq!(constraints.len(), 2);
        assert_eq!(constraints[1].name, "chp_flow_ratio_fix_mychp_2");
        assert_eq!(constraints[1].flows[0].1, "my chp_electric");
    }
}
