use clap::{Parser, Subcommand};

/// Campus administration console backend
#[derive(Parser)]
#[command(name = "campus-admin", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the API server
    Serve {
        /// Port to bind (defaults to CAMPUS_PORT)
        #[arg(short, long, env = "CAMPUS_PORT")]
        port: Option<u16>,
    },

    /// Review room booking requests
    Booking {
        #[command(subcommand)]
        command: BookingCommands,
    },

    /// Inspect or reset classroom occupancy
    Classroom {
        #[command(subcommand)]
        command: ClassroomCommands,
    },

    /// Replay failed occupancy updates
    Repair {
        #[command(subcommand)]
        command: RepairCommands,
    },
}

#[derive(Subcommand)]
pub enum BookingCommands {
    /// List booking requests (pending only unless --all)
    List {
        #[arg(long)]
        all: bool,
    },
    /// Approve a pending request and mark its room occupied
    Approve { request_id: String },
    /// Reject a pending request
    Reject { request_id: String },
}

#[derive(Subcommand)]
pub enum ClassroomCommands {
    /// List classrooms and their occupancy
    List,
    /// Mark a classroom Available again
    Reset { room_no: String },
}

#[derive(Subcommand)]
pub enum RepairCommands {
    /// Run one replay pass now
    Run {
        #[arg(long, default_value = "50")]
        batch: i64,
    },
}
