pub mod feedback_file;
