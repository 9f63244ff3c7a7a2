mod test_author_graph;
mod test_partition;
