mod scheduler;
mod supervisor;
