//! Renders a [`ClientState`] as a Prometheus text exposition document.
//!
//! Blocks always come out in the same order, one row per entity in reply
//! order, so two renders of the same state are byte-identical.

use std::fmt::{self, Write};

use tracing::debug;

use crate::constants::METRIC_PREFIX;
use crate::projects::Project;
use crate::resolve::Resolver;
use crate::state::ClientState;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MetricType {
    Counter,
    Gauge,
}

impl fmt::Display for MetricType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(match *self {
            MetricType::Counter => "counter",
            MetricType::Gauge => "gauge",
        })
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
enum Value {
    Float(f64),
    Count(i64),
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Value::Float(v) => write!(f, "{:.6}", v),
            Value::Count(v) => write!(f, "{}", v),
        }
    }
}

/// Escapes a label value for the exposition format.
fn escape_label(v: &str, out: &mut String) {
    for c in v.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            _ => out.push(c),
        }
    }
}

fn float_label(v: f64) -> String {
    format!("{:.6}", v)
}

#[derive(Debug, Default)]
struct Exposition {
    buf: String,
}

impl Exposition {
    fn begin(&mut self, name: &str, kind: MetricType) {
        if !self.buf.is_empty() {
            self.buf.push('\n');
        }
        let _ = writeln!(self.buf, "# TYPE {}{} {}", METRIC_PREFIX, name, kind);
    }

    fn sample(&mut self, name: &str, labels: &[(&str, &str)], value: Value) {
        self.buf.push_str(METRIC_PREFIX);
        self.buf.push_str(name);
        self.buf.push('{');
        for (i, (k, v)) in labels.iter().enumerate() {
            if i > 0 {
                self.buf.push(',');
            }
            self.buf.push_str(k);
            self.buf.push_str("=\"");
            escape_label(v, &mut self.buf);
            self.buf.push('"');
        }
        // Writing into a String cannot fail.
        let _ = writeln!(self.buf, "}} {}", value);
    }

    fn per_project<F>(&mut self, state: &ClientState, name: &str, kind: MetricType, value: F)
    where
        F: Fn(&Project) -> Value,
    {
        self.begin(name, kind);
        for p in &state.projects {
            self.sample(name, &[("project", p.project_name.as_str())], value(p));
        }
    }
}

/// Builds the metrics document for `state`. `host` labels the rows of `task_table`.
pub fn format(state: &ClientState, host: &str) -> String {
    let r = Resolver::new(state);
    let mut out = Exposition::default();

    out.per_project(state, "user_total_credit", MetricType::Counter, |p| {
        Value::Float(p.user_total_credit.round())
    });
    out.per_project(state, "host_total_credit", MetricType::Counter, |p| {
        Value::Float(p.host_total_credit.round())
    });
    out.per_project(state, "jobs_success", MetricType::Counter, |p| {
        Value::Count(p.njobs_success)
    });
    out.per_project(state, "jobs_error", MetricType::Counter, |p| {
        Value::Count(p.njobs_error)
    });
    out.per_project(state, "host_avg_credit", MetricType::Gauge, |p| {
        Value::Float(p.host_expavg_credit.round())
    });
    out.per_project(state, "user_avg_credit", MetricType::Gauge, |p| {
        Value::Float(p.user_expavg_credit.round())
    });
    out.per_project(state, "project_elapsed_time", MetricType::Counter, |p| {
        Value::Float(p.elapsed_time.round())
    });

    out.begin("task_time_remaining", MetricType::Gauge);
    for t in &state.results {
        let active_state = t.active_task.active_task_state.to_string();
        out.sample(
            "task_time_remaining",
            &[
                ("project", r.project_name_by_url(&t.project_url)),
                ("state", active_state.as_str()),
                ("wuname", t.wu_name.as_str()),
            ],
            Value::Float(t.estimated_cpu_time_remaining.round()),
        );
    }

    out.begin("task_done_percent", MetricType::Gauge);
    for t in &state.results {
        let active_state = t.active_task.active_task_state.to_string();
        out.sample(
            "task_done_percent",
            &[
                ("project", r.project_name_by_url(&t.project_url)),
                ("state", active_state.as_str()),
                ("wuname", t.wu_name.as_str()),
            ],
            Value::Float(t.active_task.fraction_done * 100.0),
        );
    }

    out.begin("task_final_cpu_time", MetricType::Gauge);
    for t in &state.results {
        let ready = if t.ready_to_report { "yes" } else { "no" };
        out.sample(
            "task_final_cpu_time",
            &[("wuname", t.wu_name.as_str()), ("ready_to_upload", ready)],
            Value::Float(t.final_cpu_time.round()),
        );
    }

    out.begin("task_working_set_size", MetricType::Gauge);
    for t in &state.results {
        let active_state = t.active_task.active_task_state.to_string();
        out.sample(
            "task_working_set_size",
            &[("wuname", t.wu_name.as_str()), ("state", active_state.as_str())],
            Value::Float(t.active_task.working_set_size.round()),
        );
    }

    out.per_project(state, "project_active_jobs", MetricType::Gauge, |p| {
        Value::Count(r.active_task_count(p, false) as i64)
    });
    out.per_project(state, "project_gpu_active_jobs", MetricType::Gauge, |p| {
        Value::Count(r.active_task_count(p, true) as i64)
    });

    out.begin("task_rsc_memory_bound", MetricType::Gauge);
    for t in &state.results {
        let wu = match r.work_unit_for_task(&t.name) {
            Some(wu) => wu,
            None => {
                debug!(task = %t.name, "no work unit for task, skipping memory bound");
                continue;
            }
        };
        let active_state = t.active_task.active_task_state.to_string();
        out.sample(
            "task_rsc_memory_bound",
            &[("wuname", t.name.as_str()), ("state", active_state.as_str())],
            Value::Float(wu.rsc_memory_bound),
        );
    }

    out.begin("task_table", MetricType::Gauge);
    for t in &state.results {
        let active_state = t.active_task.active_task_state.to_string();
        let app = r.application_label(&t.wu_name);
        let time_left = float_label(t.estimated_cpu_time_remaining.round());
        let time_elapsed = float_label(t.active_task.elapsed_time.round());
        let progress = float_label(t.active_task.fraction_done * 100.0);
        out.sample(
            "task_table",
            &[
                ("project", r.project_name_by_url(&t.project_url)),
                ("name", t.name.as_str()),
                ("state", active_state.as_str()),
                ("use", t.resources.as_str()),
                ("host", host),
                ("app", app.as_str()),
                ("timeLeft", time_left.as_str()),
                ("timeElapsed", time_elapsed.as_str()),
                ("progress", progress.as_str()),
            ],
            Value::Count(1),
        );
    }

    out.buf
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::{App, AppVersion};
    use crate::tasks::{ActiveTask, Task};
    use crate::workunit::Workunit;

    fn crafted() -> ClientState {
        ClientState {
            projects: vec![Project {
                master_url: "http://x/".into(),
                project_name: "X".into(),
                user_total_credit: 123.6,
                host_total_credit: 99.4,
                user_expavg_credit: 10.5,
                njobs_success: 7,
                njobs_error: 1,
                ..Default::default()
            }],
            results: vec![Task {
                name: "t1_0".into(),
                wu_name: "t1".into(),
                project_url: "http://x/".into(),
                resources: "1 CPU".into(),
                estimated_cpu_time_remaining: 3600.4,
                final_cpu_time: 12.5,
                active_task: ActiveTask {
                    active_task_state: 1,
                    elapsed_time: 60.2,
                    working_set_size: 1024.0,
                    fraction_done: 0.5,
                    ..Default::default()
                },
                ..Default::default()
            }],
            workunits: vec![Workunit {
                name: "t1".into(),
                app_name: "app".into(),
                rsc_memory_bound: 524288000.0,
                ..Default::default()
            }],
            app_versions: vec![AppVersion {
                app_name: "app".into(),
                version_num: 712,
                ..Default::default()
            }],
            apps: vec![App {
                name: "app".into(),
                user_friendly_name: "Test App".into(),
                ..Default::default()
            }],
        }
    }

    fn lines(doc: &str) -> Vec<&str> {
        doc.lines().collect()
    }

    #[test]
    fn empty_state_has_no_rows() {
        let doc = format(&ClientState::default(), "localhost");
        assert!(!doc.is_empty());
        for line in doc.lines() {
            assert!(line.is_empty() || line.starts_with("# TYPE "), "{}", line);
        }
        assert_eq!(doc.matches("# TYPE ").count(), 15);
    }

    #[test]
    fn crafted_state() {
        let doc = format(&crafted(), "localhost");
        let lines = lines(&doc);

        for expected in &[
            "boinc_client_user_total_credit{project=\"X\"} 124.000000",
            "boinc_client_host_total_credit{project=\"X\"} 99.000000",
            "boinc_client_jobs_success{project=\"X\"} 7",
            "boinc_client_jobs_error{project=\"X\"} 1",
            "boinc_client_user_avg_credit{project=\"X\"} 11.000000",
            "boinc_client_task_time_remaining{project=\"X\",state=\"1\",wuname=\"t1\"} 3600.000000",
            "boinc_client_task_done_percent{project=\"X\",state=\"1\",wuname=\"t1\"} 50.000000",
            "boinc_client_task_final_cpu_time{wuname=\"t1\",ready_to_upload=\"no\"} 13.000000",
            "boinc_client_task_working_set_size{wuname=\"t1\",state=\"1\"} 1024.000000",
            "boinc_client_project_active_jobs{project=\"X\"} 1",
            "boinc_client_project_gpu_active_jobs{project=\"X\"} 0",
            "boinc_client_task_rsc_memory_bound{wuname=\"t1_0\",state=\"1\"} 524288000.000000",
            "boinc_client_task_table{project=\"X\",name=\"t1_0\",state=\"1\",use=\"1 CPU\",\
             host=\"localhost\",app=\"7.12 Test App\",timeLeft=\"3600.000000\",\
             timeElapsed=\"60.000000\",progress=\"50.000000\"} 1",
        ] {
            assert!(lines.contains(expected), "missing {}", expected);
        }
    }

    #[test]
    fn blocks_in_fixed_order() {
        let doc = format(&crafted(), "h");
        let names: Vec<&str> = doc
            .lines()
            .filter_map(|l| l.strip_prefix("# TYPE boinc_client_"))
            .map(|l| l.split(' ').next().unwrap())
            .collect();
        assert_eq!(
            names,
            vec![
                "user_total_credit",
                "host_total_credit",
                "jobs_success",
                "jobs_error",
                "host_avg_credit",
                "user_avg_credit",
                "project_elapsed_time",
                "task_time_remaining",
                "task_done_percent",
                "task_final_cpu_time",
                "task_working_set_size",
                "project_active_jobs",
                "project_gpu_active_jobs",
                "task_rsc_memory_bound",
                "task_table",
            ]
        );
        assert!(doc.contains("} 124.000000\n\n# TYPE boinc_client_host_total_credit counter\n"));
    }

    #[test]
    fn unresolved_work_unit_only_drops_memory_bound() {
        let mut state = crafted();
        state.workunits.clear();
        let doc = format(&state, "localhost");

        assert!(!doc.contains("boinc_client_task_rsc_memory_bound{"));
        assert!(doc.contains("boinc_client_task_time_remaining{project=\"X\",state=\"1\",wuname=\"t1\"}"));
        assert!(doc.contains("boinc_client_task_table{project=\"X\",name=\"t1_0\""));
        assert!(doc.contains("app=\"\""));
    }

    #[test]
    fn ready_to_upload_label() {
        let mut state = crafted();
        state.results[0].ready_to_report = true;
        let doc = format(&state, "localhost");
        assert!(doc.contains("boinc_client_task_final_cpu_time{wuname=\"t1\",ready_to_upload=\"yes\"} 13.000000"));
    }

    #[test]
    fn unknown_project_gets_empty_label() {
        let mut state = crafted();
        state.results[0].project_url = "http://elsewhere/".into();
        let doc = format(&state, "localhost");
        assert!(doc.contains("boinc_client_task_time_remaining{project=\"\",state=\"1\",wuname=\"t1\"}"));
        assert!(doc.contains("boinc_client_project_active_jobs{project=\"X\"} 0"));
    }

    #[test]
    fn label_values_are_escaped() {
        let mut state = crafted();
        state.projects[0].project_name = "say \"hi\"\\".into();
        let doc = format(&state, "localhost");
        assert!(doc.contains("boinc_client_jobs_success{project=\"say \\\"hi\\\"\\\\\"} 7"));
    }

    #[test]
    fn sample_line_layout() {
        let mut out = Exposition::default();
        out.begin("jobs_error", MetricType::Counter);
        out.sample("jobs_error", &[("project", "X"), ("state", "a\nb")], Value::Count(-1));
        out.begin("task_done_percent", MetricType::Gauge);
        out.sample("task_done_percent", &[], Value::Float(0.5));
        assert_eq!(
            out.buf,
            "# TYPE boinc_client_jobs_error counter\n\
             boinc_client_jobs_error{project=\"X\",state=\"a\\nb\"} -1\n\
             \n\
             # TYPE boinc_client_task_done_percent gauge\n\
             boinc_client_task_done_percent{} 0.500000\n"
        );
    }

    #[test]
    fn render_is_deterministic() {
        let state = crafted();
        assert_eq!(format(&state, "localhost"), format(&state, "localhost"));
    }
}
