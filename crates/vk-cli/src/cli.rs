//! Command-line arguments for `vk-call`

use clap::Parser;
use vk_api::{CallParameters, Pagination};

/// Id list sent in chunks under one parameter name
#[derive(Debug, Clone, PartialEq)]
pub struct IdList {
    pub param: String,
    pub ids: Vec<u64>,
}

#[derive(Debug, Parser)]
#[command(name = "vk-call")]
#[command(about = "Call a VK API method and print the result as JSON lines")]
pub struct Args {
    /// Config file (defaults to $VK_CALL_CONFIG, then ./vk-call.toml)
    #[arg(long)]
    pub config: Option<String>,

    /// Follow offset pagination until every item is fetched
    #[arg(long, conflicts_with_all = ["single_page", "ids"])]
    paginate: bool,

    /// Fetch only the first page of a paginated method
    #[arg(long, conflicts_with = "ids")]
    single_page: bool,

    /// Send an id list in URL-sized chunks
    #[arg(long, value_name = "PARAM=1,2,3", value_parser = parse_id_list)]
    pub ids: Option<IdList>,

    /// Print Prometheus metrics to stderr when done
    #[arg(long)]
    pub metrics: bool,

    /// API method, e.g. users.get
    pub method: String,

    /// Call parameters
    #[arg(value_name = "NAME=VALUE", value_parser = parse_param)]
    params: Vec<(String, String)>,
}

impl Args {
    /// Pagination mode, `None` for a plain call.
    pub fn pagination(&self) -> Option<Pagination> {
        if self.paginate {
            Some(Pagination::Enabled)
        } else if self.single_page {
            Some(Pagination::SinglePage)
        } else {
            None
        }
    }

    pub fn call_parameters(&self) -> CallParameters {
        self.params.iter().cloned().collect()
    }
}

fn parse_param(arg: &str) -> Result<(String, String), String> {
    let (name, value) = arg
        .split_once('=')
        .ok_or_else(|| format!("expected name=value, got: {arg}"))?;
    if name.is_empty() {
        return Err(format!("parameter name must not be empty: {arg}"));
    }
    Ok((name.to_owned(), value.to_owned()))
}

fn parse_id_list(arg: &str) -> Result<IdList, String> {
    let (param, list) = arg
        .split_once('=')
        .ok_or_else(|| format!("expected PARAM=1,2,3, got: {arg}"))?;
    if param.is_empty() {
        return Err("id parameter name must not be empty".into());
    }
    let ids = list
        .split(',')
        .filter(|s| !s.is_empty())
        .map(|s| s.trim().parse::<u64>().map_err(|e| format!("invalid id {s}: {e}")))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(IdList {
        param: param.to_owned(),
        ids,
    })
}
