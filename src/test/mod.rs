mod link;
mod name;
mod producer;
mod red;
