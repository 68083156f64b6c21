//! Recursive goal progress rollup.
//!
//! A goal's progress is the task-count-weighted mix of its direct tasks and
//! its sub-goals. Every unit of weight is one task anywhere in the goal's
//! subtree, so a sub-goal carrying many tasks outweighs a sibling with few.
//!
//! The rollup is evaluated bottom-up with an explicit stack, once per goal,
//! so tree depth costs neither stack space nor repeated subtree walks.

use std::collections::{HashMap, HashSet};

use super::types::{Goal, Task};

/// Compute a goal's completion percentage in `[0, 100]`.
///
/// Both collections must be complete, not pre-filtered: the rollup does its
/// own filtering to find direct tasks, sub-goals, and subtree task counts.
/// Goals with no tasks anywhere in their subtree are 0% done.
pub fn calculate_goal_progression(goal: &Goal, all_goals: &[Goal], all_tasks: &[Task]) -> u8 {
    let tree = GoalTree::new(all_goals, all_tasks);
    let mut memo = HashMap::new();
    match tree.cycle_through(goal.id.as_str()) {
        Some(cycle) => tree.cycle_rollup(&cycle, &mut memo).progress,
        None => tree.fill(goal.id.as_str(), &mut memo).progress,
    }
}

/// Compute progress for every goal in `all_goals`, keyed by goal id.
pub fn progress_by_goal(all_goals: &[Goal], all_tasks: &[Task]) -> HashMap<String, u8> {
    let tree = GoalTree::new(all_goals, all_tasks);
    let mut memo: HashMap<&str, Rollup> = HashMap::new();
    let mut on_cycle: HashMap<&str, u8> = HashMap::new();

    for cycle in tree.cycles(all_goals) {
        for start in 0..cycle.len() {
            let mut rotated = cycle[start..].to_vec();
            rotated.extend_from_slice(&cycle[..start]);
            let rollup = tree.cycle_rollup(&rotated, &mut memo);
            on_cycle.insert(cycle[start], rollup.progress);
        }
    }

    all_goals
        .iter()
        .map(|goal| {
            let id = goal.id.as_str();
            let progress = match on_cycle.get(id) {
                Some(&progress) => progress,
                None => tree.fill(id, &mut memo).progress,
            };
            (goal.id.clone(), progress)
        })
        .collect()
}

/// Subtree task count and the rolled-up percentage for one goal.
#[derive(Debug, Clone, Copy, Default)]
struct Rollup {
    tasks: usize,
    progress: u8,
}

/// Parent → children, child → parent and goal → tasks indexes over borrowed
/// collections.
struct GoalTree<'a> {
    children: HashMap<&'a str, Vec<&'a Goal>>,
    parents: HashMap<&'a str, &'a str>,
    tasks: HashMap<&'a str, Vec<&'a Task>>,
}

impl<'a> GoalTree<'a> {
    fn new(goals: &'a [Goal], tasks: &'a [Task]) -> Self {
        let mut children: HashMap<&str, Vec<&Goal>> = HashMap::new();
        let mut parents: HashMap<&str, &str> = HashMap::new();
        for goal in goals {
            if let Some(parent) = goal.parent_goal_id.as_deref() {
                children.entry(parent).or_default().push(goal);
                parents.insert(goal.id.as_str(), parent);
            }
        }

        let mut by_goal: HashMap<&str, Vec<&Task>> = HashMap::new();
        for task in tasks {
            if let Some(goal_id) = task.goal_id.as_deref() {
                by_goal.entry(goal_id).or_default().push(task);
            }
        }

        Self {
            children,
            parents,
            tasks: by_goal,
        }
    }

    fn direct_tasks(&self, id: &str) -> &[&'a Task] {
        self.tasks.get(id).map(Vec::as_slice).unwrap_or(&[])
    }

    fn sub_goals(&self, id: &str) -> &[&'a Goal] {
        self.children.get(id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// The parent cycle `id` sits on, as `[id, parent, grandparent, ...]`.
    fn cycle_through(&self, id: &'a str) -> Option<Vec<&'a str>> {
        let mut walk = vec![id];
        let mut seen: HashSet<&str> = HashSet::from([id]);
        let mut current = id;
        while let Some(&parent) = self.parents.get(current) {
            if parent == id {
                return Some(walk);
            }
            if !seen.insert(parent) {
                return None;
            }
            walk.push(parent);
            current = parent;
        }
        None
    }

    /// Every parent cycle among `goals`, each listed child-to-parent.
    ///
    /// Each goal has at most one parent, so following parent links from any
    /// goal ends at a root or enters exactly one cycle.
    fn cycles(&self, goals: &'a [Goal]) -> Vec<Vec<&'a str>> {
        let mut finished: HashSet<&str> = HashSet::new();
        let mut cycles = Vec::new();

        for goal in goals {
            let mut walk: Vec<&str> = Vec::new();
            let mut position: HashMap<&str, usize> = HashMap::new();
            let mut current = Some(goal.id.as_str());

            while let Some(id) = current {
                if finished.contains(id) {
                    break;
                }
                if let Some(&start) = position.get(id) {
                    cycles.push(walk[start..].to_vec());
                    break;
                }
                position.insert(id, walk.len());
                walk.push(id);
                current = self.parents.get(id).copied();
            }
            finished.extend(walk);
        }

        cycles
    }

    /// Roll up `root` and every goal beneath it, post-order, memoizing each
    /// result. `root` must not sit on a parent cycle.
    fn fill(&self, root: &'a str, memo: &mut HashMap<&'a str, Rollup>) -> Rollup {
        let mut open: HashSet<&str> = HashSet::new();
        let mut stack = vec![(root, false)];

        while let Some((id, expanded)) = stack.pop() {
            if memo.contains_key(id) {
                continue;
            }
            if expanded {
                let rollup = self.combine(id, |child| memo.get(child).copied());
                memo.insert(id, rollup);
                continue;
            }
            if !open.insert(id) {
                continue;
            }
            stack.push((id, true));
            for &child in self.sub_goals(id) {
                let child = child.id.as_str();
                if !memo.contains_key(child) && !open.contains(child) {
                    stack.push((child, false));
                }
            }
        }

        memo.get(root).copied().unwrap_or_default()
    }

    /// Roll up `cycle[0]`, treating it as absent wherever it reappears below
    /// itself. `cycle` is listed child-to-parent as from [`Self::cycle_through`].
    fn cycle_rollup(&self, cycle: &[&'a str], memo: &mut HashMap<&'a str, Rollup>) -> Rollup {
        let Some(&root) = cycle.first() else {
            return Rollup::default();
        };
        tracing::warn!(goal_id = root, "goal parent cycle detected during progress rollup");

        let members: HashSet<&str> = cycle.iter().copied().collect();
        let mut below: Option<(&str, Rollup)> = None;
        // Deepest first: root's parent, then up the cycle, ending at root.
        let ascent = cycle[1..].iter().copied().chain(std::iter::once(root));

        for id in ascent {
            for &child in self.sub_goals(id) {
                let child = child.id.as_str();
                if !members.contains(child) {
                    self.fill(child, memo);
                }
            }
            let rollup = self.combine(id, |child| match below {
                Some((below_id, rollup)) if below_id == child => Some(rollup),
                _ if members.contains(child) => None,
                _ => memo.get(child).copied(),
            });
            below = Some((id, rollup));
        }

        below.map(|(_, rollup)| rollup).unwrap_or_default()
    }

    /// Combine `id`'s direct tasks with the rollups of its sub-goals.
    /// `child` returns `None` for sub-goals that must be left out.
    fn combine(&self, id: &str, mut child: impl FnMut(&str) -> Option<Rollup>) -> Rollup {
        let direct = self.direct_tasks(id);
        let subs: Vec<Rollup> = self
            .sub_goals(id)
            .iter()
            .filter_map(|sub| child(sub.id.as_str()))
            .collect();

        let total = direct.len() + subs.iter().map(|sub| sub.tasks).sum::<usize>();
        if total == 0 {
            return Rollup::default();
        }
        let weight = total as f64;

        let mut weighted = 0.0;
        if !direct.is_empty() {
            let sum: f64 = direct
                .iter()
                .map(|task| f64::from(task.status.progression()))
                .sum();
            let mean = sum / direct.len() as f64;
            weighted += (direct.len() as f64 / weight) * mean;
        }
        for sub in subs.iter().filter(|sub| sub.tasks > 0) {
            weighted += (sub.tasks as f64 / weight) * f64::from(sub.progress);
        }

        Rollup {
            tasks: total,
            progress: weighted.round().clamp(0.0, 100.0) as u8,
        }
    }
}
