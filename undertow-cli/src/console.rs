//! Console rendering of events and routing tables.

use undertow_core::{NodeId, RouteEvent, RouteObserver, RoutingTable, ShortestCostMatrix};

/// Prints link changes and convergence; with `verbose`, rounds and route
/// changes as well.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConsoleObserver {
    verbose: bool,
}

impl ConsoleObserver {
    pub fn new(verbose: bool) -> Self {
        Self { verbose }
    }
}

impl RouteObserver for ConsoleObserver {
    fn on_event(&mut self, event: &RouteEvent) {
        if let Some(line) = render_event(event, self.verbose) {
            println!("{line}");
        }
    }
}

fn render_event(event: &RouteEvent, verbose: bool) -> Option<String> {
    match event {
        RouteEvent::RoundStart { round } if verbose => Some(format!("--- Round {round} ---")),
        RouteEvent::RouteChanged {
            router,
            dest,
            old_cost,
            new_cost,
            next_hop,
        } if verbose => Some(format!(
            "  {router} -> {dest}: {old_cost} -> {new_cost} via {}",
            next_hop.as_ref().map_or("-", NodeId::as_str)
        )),
        RouteEvent::Converged { rounds } => Some(format!("Converged after {rounds} rounds")),
        RouteEvent::NotConverged { rounds } => {
            Some(format!("No quiescent round within {rounds} rounds"))
        }
        RouteEvent::LinkCostChanged { a, b, old, new } => {
            Some(format!("Link {a}-{b} cost changed: {old} -> {new}"))
        }
        _ => None,
    }
}

/// Renders one router's table as `Dest | Cost | Next hop` rows.
pub fn render_table(router: &NodeId, table: &RoutingTable) -> String {
    let mut out = format!("Routing table of {router}\n");
    out.push_str("  Dest   | Cost   | Next hop\n");
    for (dest, entry) in table {
        out.push_str(&format!(
            "  {:6} | {:>6} | {}\n",
            dest.as_str(),
            entry.cost.to_string(),
            entry.next_hop.as_ref().map_or("-", NodeId::as_str)
        ));
    }
    out
}

/// Renders the all-pairs cost matrix with sources as rows.
pub fn render_matrix(matrix: &ShortestCostMatrix) -> String {
    let mut rows = matrix.iter().peekable();
    let Some((_, first)) = rows.peek() else {
        return String::new();
    };

    let mut out = String::from("       ");
    for dest in first.keys() {
        out.push_str(&format!("{:>6}", dest.as_str()));
    }
    out.push('\n');

    for (source, row) in rows {
        out.push_str(&format!("{:6} ", source.as_str()));
        for cost in row.values() {
            out.push_str(&format!("{:>6}", cost.to_string()));
        }
        out.push('\n');
    }
    out
}
