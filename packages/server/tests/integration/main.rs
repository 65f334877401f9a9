mod assets;
mod feedback;
