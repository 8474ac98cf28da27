use crate::constraint_planner::QueryPlan;
use crate::execution_cursor::RowSnapshot;
use crate::host::HostSession;
use crate::module::{TableCursor, VirtualTable, VirtualTableModule};
use crate::row::Row;
use crate::schema::{TableColumn, TableSchema};
use crate::table_arguments::TableArguments;
use shared::ExtensionError::{MalformedRelationShape, MissingRequiredConstraint};
use shared::{logger, ExtensionError, ExtensionLayer, Value};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

pub const DOMINATOR_TREE_MODULE_NAME: &str = "dominator_tree";

//Immediate dominators of a directed graph, one scan per root. The
//graph is streamed from the edges relation at every scan, nothing is
//cached across queries. Exposed rows are (root, node, idom) for every
//node reachable from the bound root, except the root itself.
//
//Declared as: dominator_tree(edges=(<relation yielding tail, head>))
pub struct DominatorTreeModule;

impl DominatorTreeModule {
    pub fn create() -> DominatorTreeModule {
        DominatorTreeModule
    }
}

impl VirtualTableModule for DominatorTreeModule {
    fn module_name(&self) -> &'static str {
        DOMINATOR_TREE_MODULE_NAME
    }

    fn connect(
        &self,
        session: Arc<dyn HostSession>,
        table_name: &str,
        arguments: &TableArguments,
    ) -> Result<Arc<dyn VirtualTable>, ExtensionError> {
        let edges_sql = arguments.named_or_err("edges")?.to_string();

        let schema = TableSchema::create(vec![
            TableColumn::create_pushdown("root", false, true),
            TableColumn::create("node"),
            TableColumn::create("idom"),
        ]);

        Ok(Arc::new(DominatorTreeTable {
            table_name: table_name.to_string(),
            session,
            edges_sql,
            schema,
        }))
    }
}

pub struct DominatorTreeTable {
    table_name: String,
    session: Arc<dyn HostSession>,
    edges_sql: String,
    schema: TableSchema,
}

impl VirtualTable for DominatorTreeTable {
    fn schema(&self) -> &TableSchema {
        &self.schema
    }

    fn open_cursor(&self) -> Box<dyn TableCursor> {
        Box::new(DominatorTreeCursor {
            table_name: self.table_name.clone(),
            session: self.session.clone(),
            edges_sql: self.edges_sql.clone(),
        })
    }
}

struct DominatorTreeCursor {
    table_name: String,
    session: Arc<dyn HostSession>,
    edges_sql: String,
}

impl TableCursor for DominatorTreeCursor {
    fn filter(&mut self, plan: &QueryPlan, arguments: &[Value]) -> Result<RowSnapshot, ExtensionError> {
        //The planner already rejects plans without the root equality,
        //this re-check guards against a host driving a stale plan
        let root_value = plan.argument_for_column(0)
            .and_then(|argument_index| arguments.get(argument_index))
            .ok_or_else(|| MissingRequiredConstraint(String::from("root")))?;
        let root = root_value.get_i64()?;

        let graph = ReachableGraph::build(&*self.session, &self.edges_sql, root)?;
        let idoms = graph.immediate_dominators(&self.table_name)?;

        let mut rows = Vec::with_capacity(graph.node_count().saturating_sub(1));
        for node in 0..graph.node_count() {
            if node == graph.root() {
                continue;
            }
            rows.push(Row::create(vec![
                Value::create_i64(root),
                Value::create_i64(graph.label(node)),
                Value::create_i64(graph.label(idoms[node])),
            ]));
        }

        Ok(Arc::new(rows))
    }
}

//Nodes reachable from the root, as dense indexes into an arena. Index
//order is reverse postorder of a depth first traversal, so index 0 is
//the root and every node's depth first tree parent has a smaller
//index. That ordering is what makes the intersection walks terminate.
struct ReachableGraph {
    labels: Vec<i64>, //Dense index -> original node id
    predecessors: Vec<Vec<usize>>,
}

impl ReachableGraph {
    fn build(session: &dyn HostSession, edges_sql: &str, root: i64) -> Result<ReachableGraph, ExtensionError> {
        let result = session.select_rows(edges_sql)?;
        if result.columns.len() != 2 {
            return Err(MalformedRelationShape(edges_sql.to_string(), 2, result.columns.len()));
        }

        let mut successors: HashMap<i64, Vec<i64>> = HashMap::new();
        let mut seen_edges: HashSet<(i64, i64)> = HashSet::new();

        for row in &result.rows {
            if row.column_count() != 2 {
                return Err(MalformedRelationShape(edges_sql.to_string(), 2, row.column_count()));
            }

            let tail = row.get_value(0).ok_or(ExtensionError::Internal)?.get_i64()?;
            let head = row.get_value(1).ok_or(ExtensionError::Internal)?.get_i64()?;

            //Self loops and duplicates cannot affect dominance
            if tail == head || !seen_edges.insert((tail, head)) {
                continue;
            }

            successors.entry(tail).or_default().push(head);
            successors.entry(head).or_default();
        }

        Ok(Self::traverse(root, &successors))
    }

    //Iterative depth first traversal from the root. Nodes are numbered
    //by reverse postorder, unreachable nodes are never materialized.
    fn traverse(root: i64, successors: &HashMap<i64, Vec<i64>>) -> ReachableGraph {
        static EMPTY: Vec<i64> = Vec::new();

        let mut postorder: Vec<i64> = Vec::new();
        let mut visited: HashSet<i64> = HashSet::new();
        //(node, index of the next successor to descend into)
        let mut stack: Vec<(i64, usize)> = vec![(root, 0)];
        visited.insert(root);

        while let Some((node, successor_index)) = stack.pop() {
            let node_successors = successors.get(&node).unwrap_or(&EMPTY);

            match node_successors.get(successor_index) {
                Some(&successor) => {
                    stack.push((node, successor_index + 1));
                    if visited.insert(successor) {
                        stack.push((successor, 0));
                    }
                },
                None => postorder.push(node),
            }
        }

        let mut labels: Vec<i64> = postorder;
        labels.reverse();

        let mut dense_index: HashMap<i64, usize> = HashMap::new();
        for (index, &label) in labels.iter().enumerate() {
            dense_index.insert(label, index);
        }

        let mut predecessors: Vec<Vec<usize>> = vec![Vec::new(); labels.len()];
        for (tail, tail_successors) in successors {
            let tail_index = match dense_index.get(tail) {
                Some(tail_index) => *tail_index,
                None => continue, //Unreachable tail
            };
            for head in tail_successors {
                if let Some(&head_index) = dense_index.get(head) {
                    predecessors[head_index].push(tail_index);
                }
            }
        }
        for node_predecessors in predecessors.iter_mut() {
            node_predecessors.sort_unstable();
            node_predecessors.dedup();
        }

        ReachableGraph { labels, predecessors }
    }

    fn node_count(&self) -> usize {
        self.labels.len()
    }

    fn root(&self) -> usize {
        0
    }

    fn label(&self, node: usize) -> i64 {
        self.labels[node]
    }

    //Iterative dominance fixpoint (Cooper, Harvey, Kennedy). Sweeps
    //the nodes in reverse postorder intersecting the dominators of
    //already processed predecessors until nothing changes. Every non
    //root node has its depth first tree parent among its processed
    //predecessors, so the first sweep already defines every entry.
    fn immediate_dominators(&self, table_name: &str) -> Result<Vec<usize>, ExtensionError> {
        const UNDEFINED: usize = usize::MAX;

        let mut idoms = vec![UNDEFINED; self.node_count()];
        if self.node_count() == 0 {
            return Ok(idoms);
        }
        idoms[self.root()] = self.root();

        let mut passes = 0;
        let mut changed = true;
        while changed {
            changed = false;
            passes += 1;

            for node in 1..self.node_count() {
                let mut new_idom = UNDEFINED;

                for &predecessor in &self.predecessors[node] {
                    if idoms[predecessor] == UNDEFINED {
                        continue;
                    }
                    new_idom = if new_idom == UNDEFINED {
                        predecessor
                    } else {
                        self.intersect(&idoms, predecessor, new_idom)
                    };
                }

                if new_idom != UNDEFINED && idoms[node] != new_idom {
                    idoms[node] = new_idom;
                    changed = true;
                }
            }
        }

        //Every reachable non root node has its depth first tree
        //parent among its predecessors, so the fixpoint defines all
        //entries. Anything else is a bug in the traversal.
        if idoms.iter().any(|idom| *idom == UNDEFINED) {
            return Err(ExtensionError::Internal);
        }

        logger().debug(ExtensionLayer::Module(table_name.to_string()),
                       &format!("Dominance fixpoint over {} nodes converged after {} passes",
                                self.node_count(), passes));

        Ok(idoms)
    }

    //Nearest common dominator of two nodes: walk both idom chains
    //upward, always advancing the one with the larger reverse
    //postorder number, until they meet
    fn intersect(&self, idoms: &[usize], mut a: usize, mut b: usize) -> usize {
        while a != b {
            while a > b {
                a = idoms[a];
            }
            while b > a {
                b = idoms[b];
            }
        }
        a
    }
}

#[cfg(test)]
mod test {
    use crate::constraint_planner::{ColumnConstraint, ConstraintOp, QueryPlan};
    use crate::mock_session::MockSession;
    use crate::modules::DominatorTreeModule;
    use crate::row::Row;
    use crate::runtime::{TableHandle, VirtualTableRuntime};
    use shared::{ErrorKind, ExtensionError, ExtensionOptions, Value};
    use std::sync::Arc;

    const EDGES: &str = "(SELECT tail, head FROM e)";

    fn edge_rows(edges: &[(i64, i64)]) -> Vec<Row> {
        edges.iter()
            .map(|(tail, head)| Row::create(vec![Value::create_i64(*tail), Value::create_i64(*head)]))
            .collect()
    }

    fn connect(edges: &[(i64, i64)]) -> TableHandle {
        let mut runtime = VirtualTableRuntime::create(Arc::new(ExtensionOptions::default()));
        runtime.register_module(Box::new(DominatorTreeModule::create()));

        let mut session = MockSession::create();
        session.add_relation(EDGES, vec!["tail", "head"], edge_rows(edges));

        runtime.connect(Arc::new(session), "dominator_tree", "dom", &[
            format!("edges={}", EDGES),
        ]).unwrap()
    }

    fn root_plan(table: &TableHandle) -> QueryPlan {
        table.best_index(&[ColumnConstraint {
            column_index: 0,
            op: ConstraintOp::Equal,
            usable: true,
        }]).unwrap()
    }

    //Collects (node, idom) pairs for the given root, sorted by node
    fn dominators(table: &TableHandle, root: i64) -> Vec<(i64, i64)> {
        let plan = root_plan(table);
        let mut cursor = table.open();
        cursor.filter(&plan, &[Value::create_i64(root)]).unwrap();

        let mut pairs = Vec::new();
        while !cursor.eof() {
            assert_eq!(cursor.column(0).unwrap().get_i64().unwrap(), root);
            pairs.push((
                cursor.column(1).unwrap().get_i64().unwrap(),
                cursor.column(2).unwrap().get_i64().unwrap(),
            ));
            cursor.next();
        }
        cursor.close();

        pairs.sort_unstable();
        pairs
    }

    #[test]
    fn diamond_with_shortcut() {
        //Node 3 is reached through 2 and directly from 1, so its
        //immediate dominator is 1, not 2
        let table = connect(&[(0, 1), (1, 2), (2, 3), (1, 3)]);

        assert_eq!(dominators(&table, 0), vec![(1, 0), (2, 1), (3, 1)]);
    }

    #[test]
    fn straight_line_chain() {
        let table = connect(&[(10, 20), (20, 30), (30, 40)]);

        assert_eq!(dominators(&table, 10), vec![(20, 10), (30, 20), (40, 30)]);
    }

    #[test]
    fn classic_branch_and_join() {
        //     0
        //    / \
        //   1   2
        //    \ /
        //     3
        let table = connect(&[(0, 1), (0, 2), (1, 3), (2, 3)]);

        assert_eq!(dominators(&table, 0), vec![(1, 0), (2, 0), (3, 0)]);
    }

    #[test]
    fn loop_back_edge_does_not_change_dominators() {
        let table = connect(&[(0, 1), (1, 2), (2, 1)]);

        assert_eq!(dominators(&table, 0), vec![(1, 0), (2, 1)]);
    }

    #[test]
    fn irreducible_loop() {
        //0 branches to 1 and 2 which reach each other, so neither
        //dominates the other and both idoms collapse to the root
        let table = connect(&[(0, 1), (0, 2), (1, 2), (2, 1)]);

        assert_eq!(dominators(&table, 0), vec![(1, 0), (2, 0)]);
    }

    #[test]
    fn unreachable_nodes_are_excluded() {
        let table = connect(&[(0, 1), (5, 6), (6, 7)]);

        assert_eq!(dominators(&table, 0), vec![(1, 0)]);
        //The same table answers for another root within the same graph
        assert_eq!(dominators(&table, 5), vec![(6, 5), (7, 6)]);
    }

    #[test]
    fn duplicates_and_self_loops_are_ignored() {
        let plain = connect(&[(0, 1), (1, 2), (2, 3), (1, 3)]);
        let noisy = connect(&[
            (0, 1), (1, 2), (2, 3), (1, 3),
            (0, 1), (1, 2), //Duplicates
            (1, 1), (3, 3), //Self loops
        ]);

        assert_eq!(dominators(&plain, 0), dominators(&noisy, 0));
    }

    #[test]
    fn root_absent_from_graph_yields_no_rows() {
        let table = connect(&[(0, 1)]);

        assert!(dominators(&table, 99).is_empty());
    }

    #[test]
    fn missing_root_constraint_is_a_usage_error() {
        let table = connect(&[(0, 1)]);

        let error = table.best_index(&[]).unwrap_err();
        assert_eq!(error.kind(), ErrorKind::Usage);
        assert!(matches!(error, ExtensionError::MissingRequiredConstraint(ref name) if name == "root"));
    }

    #[test]
    fn edges_relation_must_have_two_columns() {
        let mut runtime = VirtualTableRuntime::create(Arc::new(ExtensionOptions::default()));
        runtime.register_module(Box::new(DominatorTreeModule::create()));

        let mut session = MockSession::create();
        session.add_relation(EDGES, vec!["tail", "head", "weight"], vec![
            Row::create(vec![Value::create_i64(0), Value::create_i64(1), Value::create_i64(7)]),
        ]);

        let table = runtime.connect(Arc::new(session), "dominator_tree", "dom", &[
            format!("edges={}", EDGES),
        ]).unwrap();

        let plan = root_plan(&table);
        let mut cursor = table.open();
        let error = cursor.filter(&plan, &[Value::create_i64(0)]).unwrap_err();

        assert_eq!(error.kind(), ErrorKind::Execution);
    }

    #[test]
    fn missing_edges_argument_fails_at_declaration() {
        let mut runtime = VirtualTableRuntime::create(Arc::new(ExtensionOptions::default()));
        runtime.register_module(Box::new(DominatorTreeModule::create()));

        let error = runtime.connect(Arc::new(MockSession::create()), "dominator_tree", "dom", &[])
            .unwrap_err();

        assert_eq!(error.kind(), ErrorKind::Schema);
        assert!(matches!(error, ExtensionError::MissingModuleArgument("edges")));
    }
}
