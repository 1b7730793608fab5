//! Sandboxed script execution against a working copy of a table.
//!
//! Scripts are Lua, run in a state that loads only the math, string and
//! table standard libraries. The working table is bound to the global `tbl`
//! and an untouched copy of the input to `orig`; `print` and `warn` are
//! redirected into in-memory buffers. The caller's table is never mutated.

use std::cell::RefCell;
use std::collections::HashSet;
use std::rc::Rc;

use mlua::{Lua, LuaOptions, StdLib, Variadic};

use tablepilot_table::{Column, Table, Value};

/// Maximum nesting depth when copying Lua tables into the variable map.
const VARIABLE_DEPTH_LIMIT: usize = 4;

/// Result of one sandboxed execution.
#[derive(Debug, Clone)]
pub struct ExecutionResult {
    pub success: bool,
    pub stdout: String,
    pub stderr: String,
    /// The working table after execution (a copy, never the caller's).
    pub table: Table,
    /// Newly bound simple-valued globals (scalars, lists, maps).
    pub variables: serde_json::Map<String, serde_json::Value>,
    pub error: Option<String>,
}

/// The working/original table exposed to Lua.
#[derive(Clone)]
struct TableHandle {
    inner: Rc<RefCell<Table>>,
    writable: bool,
}

impl TableHandle {
    fn check_writable(&self) -> mlua::Result<()> {
        if self.writable {
            Ok(())
        } else {
            Err(mlua::Error::RuntimeError(
                "orig is read-only; operate on tbl instead".into(),
            ))
        }
    }
}

impl mlua::UserData for TableHandle {
    fn add_methods<M: mlua::UserDataMethods<Self>>(methods: &mut M) {
        methods.add_method("num_rows", |_, this, ()| Ok(this.inner.borrow().n_rows()));

        methods.add_method("num_cols", |_, this, ()| Ok(this.inner.borrow().n_cols()));

        methods.add_method("columns", |_, this, ()| {
            let names: Vec<String> = this
                .inner
                .borrow()
                .column_names()
                .into_iter()
                .map(|s| s.to_string())
                .collect();
            Ok(names)
        });

        // get(row, column) — 1-indexed; nil past the last row
        methods.add_method("get", |lua, this, (row, column): (usize, String)| {
            let table = this.inner.borrow();
            if table.column(&column).is_none() {
                return Err(mlua::Error::RuntimeError(format!(
                    "no such column {:?}",
                    column
                )));
            }
            match table.get(row.wrapping_sub(1), &column) {
                Some(value) => cell_to_lua(lua, value),
                None => Ok(mlua::Value::Nil),
            }
        });

        // set(row, column, value)
        methods.add_method(
            "set",
            |_, this, (row, column, value): (usize, String, mlua::Value)| {
                this.check_writable()?;
                let cell = lua_to_cell(&value)?;
                this.inner
                    .borrow_mut()
                    .set(row.wrapping_sub(1), &column, cell)
                    .map_err(mlua::Error::RuntimeError)
            },
        );

        // column(name) — all values as a Lua array
        methods.add_method("column", |lua, this, name: String| {
            let table = this.inner.borrow();
            let col = table.column(&name).ok_or_else(|| {
                mlua::Error::RuntimeError(format!("no such column {:?}", name))
            })?;
            let out = lua.create_table()?;
            for (i, value) in col.values().iter().enumerate() {
                out.set(i + 1, cell_to_lua(lua, value)?)?;
            }
            Ok(out)
        });

        // add_column(name, values)
        methods.add_method("add_column", |_, this, (name, values): (String, mlua::Table)| {
            this.check_writable()?;
            let mut cells = Vec::new();
            for value in values.sequence_values::<mlua::Value>() {
                cells.push(lua_to_cell(&value?)?);
            }
            this.inner
                .borrow_mut()
                .add_column(Column::new(name, cells))
                .map_err(mlua::Error::RuntimeError)
        });

        methods.add_method("drop_column", |_, this, name: String| {
            this.check_writable()?;
            this.inner
                .borrow_mut()
                .drop_column(&name)
                .map_err(mlua::Error::RuntimeError)
        });

        // filter(predicate) — predicate receives each row as {column = value}
        methods.add_method("filter", |lua, this, predicate: mlua::Function| {
            this.check_writable()?;
            // Snapshot rows first: the predicate may itself touch the handle
            let rows: Vec<Vec<(String, Value)>> = {
                let table = this.inner.borrow();
                (0..table.n_rows())
                    .map(|row| {
                        table
                            .columns()
                            .iter()
                            .filter_map(|col| {
                                col.get(row).map(|v| (col.name.clone(), v.clone()))
                            })
                            .collect()
                    })
                    .collect()
            };
            let mut keep = Vec::with_capacity(rows.len());
            for row in rows {
                let record = lua.create_table()?;
                for (name, value) in row {
                    record.set(name, cell_to_lua(lua, &value)?)?;
                }
                keep.push(predicate.call::<bool>(record)?);
            }
            this.inner
                .borrow_mut()
                .retain_rows(&keep)
                .map_err(mlua::Error::RuntimeError)
        });

        // sort_by(column, descending?)
        methods.add_method(
            "sort_by",
            |_, this, (column, descending): (String, Option<bool>)| {
                this.check_writable()?;
                this.inner
                    .borrow_mut()
                    .sort_by(&column, descending.unwrap_or(false))
                    .map_err(mlua::Error::RuntimeError)
            },
        );

        // head(n) — truncate to the first n rows
        methods.add_method("head", |_, this, n: usize| {
            this.check_writable()?;
            this.inner.borrow_mut().head_rows(n);
            Ok(())
        });
    }
}

/// Execute a Lua snippet against a copy of `table`.
///
/// Any fault is caught and reported via the result; the caller's table is
/// untouched either way. Single synchronous at-most-once execution.
pub fn execute(code: &str, table: &Table) -> ExecutionResult {
    let stdout = Rc::new(RefCell::new(String::new()));
    let stderr = Rc::new(RefCell::new(String::new()));
    let working = Rc::new(RefCell::new(table.clone()));

    let outcome = run_in_sandbox(code, table, &stdout, &stderr, &working);

    let result_table = working.borrow().clone();
    let stdout = stdout.borrow().clone();
    let stderr = stderr.borrow().clone();

    match outcome {
        Ok((table, variables)) => ExecutionResult {
            success: true,
            stdout,
            stderr,
            table,
            variables,
            error: None,
        },
        Err(e) => {
            log::debug!("sandbox execution failed: {}", e);
            ExecutionResult {
                success: false,
                stdout,
                stderr,
                table: result_table,
                variables: serde_json::Map::new(),
                error: Some(e.to_string()),
            }
        }
    }
}

fn run_in_sandbox(
    code: &str,
    original: &Table,
    stdout: &Rc<RefCell<String>>,
    stderr: &Rc<RefCell<String>>,
    working: &Rc<RefCell<Table>>,
) -> mlua::Result<(Table, serde_json::Map<String, serde_json::Value>)> {
    let lua = Lua::new_with(
        StdLib::MATH | StdLib::STRING | StdLib::TABLE,
        LuaOptions::default(),
    )?;
    let globals = lua.globals();

    // Base functions that reach the loader have no place here
    globals.set("dofile", mlua::Value::Nil)?;
    globals.set("loadfile", mlua::Value::Nil)?;
    globals.set("load", mlua::Value::Nil)?;

    // print → stdout buffer
    {
        let stdout = stdout.clone();
        globals.set(
            "print",
            lua.create_function(move |_, args: Variadic<mlua::Value>| {
                let line: Vec<String> = args.iter().map(lua_value_display).collect();
                let mut buf = stdout.borrow_mut();
                buf.push_str(&line.join("\t"));
                buf.push('\n');
                Ok(())
            })?,
        )?;
    }

    // warn → stderr buffer
    {
        let stderr = stderr.clone();
        lua.set_warning_function(move |_, text, _| {
            let mut buf = stderr.borrow_mut();
            buf.push_str(text);
            buf.push('\n');
            Ok(())
        });
    }

    globals.set(
        "tbl",
        TableHandle {
            inner: working.clone(),
            writable: true,
        },
    )?;
    globals.set(
        "orig",
        TableHandle {
            inner: Rc::new(RefCell::new(original.clone())),
            writable: false,
        },
    )?;

    // Snapshot of the namespace before user code runs
    let mut baseline: HashSet<String> = HashSet::new();
    for pair in lua.globals().pairs::<mlua::Value, mlua::Value>() {
        let (key, _) = pair?;
        if let mlua::Value::String(name) = key {
            baseline.insert(name.to_str()?.to_string());
        }
    }

    lua.load(code).exec()?;

    // The working table: whatever `tbl` still refers to, copied out
    let result_table = match globals.get::<mlua::Value>("tbl") {
        Ok(mlua::Value::UserData(ud)) => match ud.borrow::<TableHandle>() {
            Ok(handle) => handle.inner.borrow().clone(),
            Err(_) => working.borrow().clone(),
        },
        _ => working.borrow().clone(),
    };

    // Newly bound globals: primitives are copied, tables of primitives are
    // converted, tabular handles are stringified, everything else is dropped.
    let mut variables = serde_json::Map::new();
    for pair in lua.globals().pairs::<mlua::Value, mlua::Value>() {
        let (key, value) = pair?;
        let name = match key {
            mlua::Value::String(s) => s.to_str()?.to_string(),
            _ => continue,
        };
        if baseline.contains(&name) {
            continue;
        }
        if let Some(json) = lua_to_json(&value, VARIABLE_DEPTH_LIMIT) {
            variables.insert(name, json);
        }
    }

    Ok((result_table, variables))
}

// ============================================================================
// Value conversions
// ============================================================================

fn cell_to_lua(lua: &Lua, value: &Value) -> mlua::Result<mlua::Value> {
    Ok(match value {
        Value::Null => mlua::Value::Nil,
        Value::Number(n) => mlua::Value::Number(*n),
        Value::Bool(b) => mlua::Value::Boolean(*b),
        Value::Text(s) => mlua::Value::String(lua.create_string(s)?),
    })
}

fn lua_to_cell(value: &mlua::Value) -> mlua::Result<Value> {
    Ok(match value {
        mlua::Value::Nil => Value::Null,
        mlua::Value::Boolean(b) => Value::Bool(*b),
        mlua::Value::Integer(n) => Value::Number(*n as f64),
        mlua::Value::Number(n) => Value::Number(*n),
        mlua::Value::String(s) => Value::Text(s.to_str()?.to_string()),
        other => {
            return Err(mlua::Error::RuntimeError(format!(
                "cannot store a {} in a table cell",
                other.type_name()
            )))
        }
    })
}

/// Display form used by the captured `print`.
fn lua_value_display(value: &mlua::Value) -> String {
    match value {
        mlua::Value::Nil => "nil".to_string(),
        mlua::Value::Boolean(b) => b.to_string(),
        mlua::Value::Integer(n) => n.to_string(),
        mlua::Value::Number(n) => {
            if *n == (*n as i64) as f64 {
                (*n as i64).to_string()
            } else {
                n.to_string()
            }
        }
        mlua::Value::String(s) => s.to_str().map(|s| s.to_string()).unwrap_or_default(),
        mlua::Value::UserData(ud) => match ud.borrow::<TableHandle>() {
            Ok(handle) => handle.inner.borrow().brief(),
            Err(_) => "<userdata>".to_string(),
        },
        other => format!("<{}>", other.type_name()),
    }
}

/// Copy a Lua value into JSON for the variable map. Returns None for values
/// that have no simple representation (functions, threads, foreign userdata).
fn lua_to_json(value: &mlua::Value, depth: usize) -> Option<serde_json::Value> {
    match value {
        mlua::Value::Nil => Some(serde_json::Value::Null),
        mlua::Value::Boolean(b) => Some(serde_json::Value::Bool(*b)),
        mlua::Value::Integer(n) => Some(serde_json::json!(*n)),
        mlua::Value::Number(n) => serde_json::Number::from_f64(*n).map(serde_json::Value::Number),
        mlua::Value::String(s) => s.to_str().ok().map(|s| serde_json::Value::String(s.to_string())),
        mlua::Value::Table(table) => {
            if depth == 0 {
                return None;
            }
            // Sequences become arrays, everything else a string-keyed map
            let len = table.raw_len();
            if len > 0 {
                let mut items = Vec::with_capacity(len);
                for item in table.clone().sequence_values::<mlua::Value>() {
                    items.push(lua_to_json(&item.ok()?, depth - 1)?);
                }
                Some(serde_json::Value::Array(items))
            } else {
                let mut map = serde_json::Map::new();
                for pair in table.clone().pairs::<mlua::Value, mlua::Value>() {
                    let (key, value) = pair.ok()?;
                    let key = match key {
                        mlua::Value::String(s) => s.to_str().ok()?.to_string(),
                        mlua::Value::Integer(n) => n.to_string(),
                        _ => continue,
                    };
                    if let Some(json) = lua_to_json(&value, depth - 1) {
                        map.insert(key, json);
                    }
                }
                Some(serde_json::Value::Object(map))
            }
        }
        // Tabular values are stringified, never duplicated into the result
        mlua::Value::UserData(ud) => ud
            .borrow::<TableHandle>()
            .ok()
            .map(|handle| serde_json::Value::String(handle.inner.borrow().brief())),
        _ => None,
    }
}
