//! Infoblox CLI
//!
//! Command-line interface over the schema-validated WAPI client.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use ib_wapi::{
    parse_items, parse_json_object, Client, ClientConfig, GetOptions, InputError, Resource,
    ScheduleOptions, WapiError, WriteOptions,
};
use serde_json::{Map, Value};

#[derive(Parser)]
#[command(name = "ib")]
#[command(about = "Interact with Infoblox objects through the WAPI")]
#[command(version)]
struct Cli {
    /// WAPI base url, like https://host/wapi/v2.9
    #[arg(long, env = "IB_URL")]
    url: String,

    /// User name for basic authentication
    #[arg(long, env = "IB_USER")]
    user: Option<String>,

    /// Password for basic authentication
    #[arg(long, env = "IB_PASSWORD", hide_env_values = true)]
    password: Option<String>,

    /// PEM certificate to trust (server certificate is not verified otherwise)
    #[arg(long, env = "IB_CERT")]
    cert: Option<PathBuf>,

    /// Log requests to stderr (honours RUST_LOG)
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the objects supported by the api
    Objects,

    /// Print the api schema
    Schema,

    /// Send a custom request through the request object
    ///
    /// Examples:
    ///   ib request '{"data": {"name": "test.somewhere.com"}, "method": "GET", "object": "record:host"}'
    ///   ib request data:='{"name": "test.somewhere.com"}' method=GET object=record:host
    ///   ib request -j payload.json
    Request {
        /// Payload items: key=value, key:=json, or a single json object
        #[arg(required_unless_present = "json_file", conflicts_with = "json_file")]
        items: Vec<String>,

        /// File holding the json payload
        #[arg(short = 'j', long = "json-file")]
        json_file: Option<PathBuf>,
    },

    /// Operations on one object type
    Object {
        /// Object type, like network or record:host
        #[arg(short, long)]
        name: String,

        #[command(subcommand)]
        action: ObjectCommand,
    },
}

#[derive(Subcommand)]
enum ObjectCommand {
    /// Print the object schema and documentation
    Documentation,

    /// List the object fields
    Fields,

    /// List the object functions
    Functions,

    /// Describe one field
    FieldInfo {
        #[arg(short, long)]
        name: String,
    },

    /// Describe one function
    FuncInfo {
        #[arg(short, long)]
        name: String,
    },

    /// Fetch an object by reference, or search objects
    Get {
        /// Reference of the object to fetch
        #[arg(short = 'o', long)]
        object_ref: Option<String>,

        #[command(flatten)]
        search: SearchArgs,

        #[command(flatten)]
        returns: ReturnArgs,

        /// json, json-pretty, xml or xml-pretty
        #[arg(long)]
        return_type: Option<String>,
    },

    /// Count objects matching the search parameters
    Count {
        #[command(flatten)]
        search: SearchArgs,
    },

    /// Call a function of an object, or of the object type without a reference
    FuncCall {
        #[arg(short = 'o', long)]
        object_ref: Option<String>,

        /// Function name
        #[arg(short, long)]
        name: String,

        /// Arguments: key=value, key:=json, or a single json object
        items: Vec<String>,
    },

    /// Create an object
    Create {
        #[command(flatten)]
        schedule: ScheduleArgs,

        #[command(flatten)]
        returns: ReturnArgs,

        /// Fields: key=value, key:=json, or a single json object
        #[arg(required = true)]
        items: Vec<String>,
    },

    /// Update an object given its reference
    Update {
        #[arg(short = 'o', long)]
        object_ref: String,

        #[command(flatten)]
        schedule: ScheduleArgs,

        #[command(flatten)]
        returns: ReturnArgs,

        /// Fields: key=value, key:=json, or a single json object
        #[arg(required = true)]
        items: Vec<String>,
    },

    /// Delete an object given its reference
    Delete {
        #[arg(short = 'o', long)]
        object_ref: String,

        #[command(flatten)]
        schedule: ScheduleArgs,
    },
}

#[derive(Args)]
struct SearchArgs {
    /// Search parameters as a json object, like '{"comment~": "office"}'
    #[arg(short, long)]
    params: Option<String>,

    /// GM or LOCAL
    #[arg(long)]
    proxy_search: Option<String>,
}

#[derive(Args)]
struct ReturnArgs {
    /// Comma-separated list of returned fields
    #[arg(long, value_delimiter = ',')]
    return_fields: Option<Vec<String>>,

    /// Comma-separated list of fields returned on top of the default ones
    #[arg(long, value_delimiter = ',')]
    return_fields_plus: Option<Vec<String>>,
}

#[derive(Args)]
struct ScheduleArgs {
    /// Unix timestamp at which the operation runs
    #[arg(long)]
    schedule_time: Option<i64>,

    /// Run the operation now
    #[arg(long)]
    schedule_now: bool,

    /// Reference of a scheduled task to run before this one
    #[arg(long)]
    schedule_predecessor_task: Option<String>,

    /// WARN or NONE
    #[arg(long)]
    schedule_warn_level: Option<String>,

    #[arg(long)]
    approval_comment: Option<String>,

    /// true or false
    #[arg(long)]
    approval_query_mode: Option<String>,

    #[arg(long)]
    approval_ticket_number: Option<i64>,
}

impl SearchArgs {
    fn to_options(&self) -> Result<GetOptions, u8> {
        let mut options = GetOptions::new();
        if let Some(params) = &self.params {
            options = options.params(parse_json_object(params).map_err(input_error)?);
        }
        if let Some(proxy) = &self.proxy_search {
            options = options.proxy_search(proxy.as_str());
        }
        Ok(options)
    }
}

impl ScheduleArgs {
    fn to_options(&self) -> ScheduleOptions {
        ScheduleOptions {
            schedule_time: self.schedule_time,
            schedule_now: self.schedule_now,
            schedule_predecessor_task: self.schedule_predecessor_task.clone(),
            schedule_warn_level: self.schedule_warn_level.clone(),
            approval_comment: self.approval_comment.clone(),
            approval_query_mode: self.approval_query_mode.clone(),
            approval_ticket_number: self.approval_ticket_number,
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(code) => ExitCode::from(code),
    }
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into())
    } else {
        tracing_subscriber::EnvFilter::new("off")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .init();
}

fn run(cli: Cli) -> Result<(), u8> {
    let mut config = ClientConfig::new(cli.url);
    config.username = cli.user;
    config.password = cli.password;
    config.cert = cli.cert;

    let client = Client::connect(&config).map_err(report)?;

    match cli.command {
        Commands::Objects => {
            let objects: Vec<Value> = client
                .available_objects()
                .into_iter()
                .map(Value::from)
                .collect();
            print_json(&Value::Array(objects));
        }
        Commands::Schema => print_json(client.api_schema()),
        Commands::Request { items, json_file } => {
            let payload = match json_file {
                Some(path) => read_json_file(&path)?,
                None => Value::Object(parse_items(&items).map_err(input_error)?),
            };
            print_json(&client.custom_request(&payload).map_err(report)?);
        }
        Commands::Object { name, action } => {
            let resource = client.get_object(&name).map_err(report)?;
            run_object(&resource, action)?;
        }
    }
    Ok(())
}

fn run_object(resource: &Resource<'_>, action: ObjectCommand) -> Result<(), u8> {
    let result = match action {
        ObjectCommand::Documentation => resource.documentation().clone(),
        ObjectCommand::Fields => Value::from(resource.fields().to_vec()),
        ObjectCommand::Functions => Value::from(resource.functions().to_vec()),
        ObjectCommand::FieldInfo { name } => to_json(resource.field_info(&name).map_err(report)?)?,
        ObjectCommand::FuncInfo { name } => {
            to_json(resource.function_info(&name).map_err(report)?)?
        }
        ObjectCommand::Get {
            object_ref,
            search,
            returns,
            return_type,
        } => {
            let mut options = search.to_options()?;
            options.return_fields = returns.return_fields;
            options.return_fields_plus = returns.return_fields_plus;
            options.return_type = return_type;
            resource
                .get(object_ref.as_deref(), &options)
                .map_err(report)?
        }
        ObjectCommand::Count { search } => {
            let options = search.to_options()?;
            Value::from(resource.count(&options).map_err(report)?)
        }
        ObjectCommand::FuncCall {
            object_ref,
            name,
            items,
        } => {
            let arguments = parse_items(&items).map_err(input_error)?;
            resource
                .func_call(object_ref.as_deref(), &name, &arguments)
                .map_err(report)?
        }
        ObjectCommand::Create {
            schedule,
            returns,
            items,
        } => {
            let fields = parse_items(&items).map_err(input_error)?;
            let options = write_options(&schedule, returns);
            resource.create(&fields, &options).map_err(report)?
        }
        ObjectCommand::Update {
            object_ref,
            schedule,
            returns,
            items,
        } => {
            let fields: Map<String, Value> = parse_items(&items).map_err(input_error)?;
            let options = write_options(&schedule, returns);
            resource
                .update(&object_ref, &fields, &options)
                .map_err(report)?
        }
        ObjectCommand::Delete {
            object_ref,
            schedule,
        } => resource
            .delete(&object_ref, &schedule.to_options())
            .map_err(report)?,
    };

    print_json(&result);
    Ok(())
}

fn write_options(schedule: &ScheduleArgs, returns: ReturnArgs) -> WriteOptions {
    WriteOptions {
        schedule: schedule.to_options(),
        return_fields: returns.return_fields,
        return_fields_plus: returns.return_fields_plus,
    }
}

fn read_json_file(path: &std::path::Path) -> Result<Value, u8> {
    let content = std::fs::read_to_string(path)
        .map_err(|source| WapiError::Io {
            path: path.display().to_string(),
            source,
        })
        .map_err(report)?;
    serde_json::from_str(&content).map_err(|_| {
        eprintln!("Error: {} is not a valid json file", path.display());
        2
    })
}

fn to_json<T: serde::Serialize>(value: &T) -> Result<Value, u8> {
    serde_json::to_value(value)
        .map_err(|source| WapiError::InvalidJson { source })
        .map_err(report)
}

fn print_json(value: &Value) {
    println!("{:#}", value);
}

/// Print an error and return its exit code.
///
/// Server error bodies go to stdout like any other answer.
fn report(err: WapiError) -> u8 {
    match &err {
        WapiError::Http { body, .. } => print_json(body),
        _ => eprintln!("Error: {}", err),
    }
    err.exit_code() as u8
}

fn input_error(err: InputError) -> u8 {
    eprintln!("Error: {}", err);
    2
}
