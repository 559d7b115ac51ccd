mod stream_scenarios;
